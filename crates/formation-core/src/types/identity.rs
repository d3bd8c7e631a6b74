use serde::{Deserialize, Serialize};

use crate::error::{FormationError, Result};
use crate::types::{ClusterTopology, ClusterType};

/// Who this node is within its node-group.
///
/// Derived once from the instance hostname and never changes for the
/// lifetime of the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    hostname: String,
    ordinal: u32,
    fqdn: String,
    is_bootstrap_role: bool,
}

impl NodeIdentity {
    /// Derive an identity from the instance hostname.
    ///
    /// The ordinal is the numeric suffix after the last `-` of the first
    /// DNS label. An unqualified hostname is qualified with `fqdn_suffix`.
    pub fn derive(hostname: &str, fqdn_suffix: Option<&str>, cluster_type: ClusterType) -> Result<Self> {
        let hostname = hostname.trim().trim_end_matches('.');
        let short = hostname.split('.').next().unwrap_or_default();
        let ordinal = Self::parse_ordinal(short)?;

        let fqdn = match fqdn_suffix.map(|s| s.trim_matches('.')) {
            Some(suffix) if !hostname.contains('.') && !suffix.is_empty() => {
                format!("{hostname}.{suffix}")
            }
            _ => hostname.to_string(),
        };

        Ok(Self {
            hostname: short.to_string(),
            ordinal,
            fqdn,
            is_bootstrap_role: ordinal == 0 && cluster_type == ClusterType::Bootstrap,
        })
    }

    /// Parse the ordinal suffix of an instance name (`dnode-2` -> 2)
    pub fn parse_ordinal(name: &str) -> Result<u32> {
        name.rsplit_once('-')
            .and_then(|(_, suffix)| suffix.parse().ok())
            .ok_or_else(|| {
                FormationError::Config(format!("hostname {name:?} has no numeric ordinal suffix"))
            })
    }

    /// Short instance name
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Ordinal within the node-group
    #[must_use]
    pub const fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Fully qualified name the admin API knows this host by
    #[must_use]
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Ordinal 0 of the cluster-bootstrap node-group
    #[must_use]
    pub const fn is_bootstrap_role(&self) -> bool {
        self.is_bootstrap_role
    }

    /// Ordinal 0 of any node-group; performs per-group configuration
    #[must_use]
    pub const fn is_designated(&self) -> bool {
        self.ordinal == 0
    }

    /// True if this node initializes the cluster rather than joining it
    #[must_use]
    pub fn establishes_cluster(&self, topology: &ClusterTopology) -> bool {
        self.is_bootstrap_role && self.fqdn.eq_ignore_ascii_case(&topology.bootstrap_host)
    }
}
