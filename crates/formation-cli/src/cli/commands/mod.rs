//! Command implementations.

pub mod bootstrap;
pub mod identity;
pub mod place_certs;

use anyhow::Result;
use formation::FormationConfig;
use std::path::PathBuf;

use super::args::NodeArgs;
use crate::config;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Optional TOML tunables
    pub config_file: Option<PathBuf>,

    /// Node and cluster inputs
    pub node: NodeArgs,
}

impl Context {
    /// Build the run configuration, failing on missing credentials.
    pub fn formation_config(&self) -> Result<FormationConfig> {
        config::build(self.config_file.as_ref(), &self.node)
    }
}
