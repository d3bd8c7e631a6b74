//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;

use crate::logging;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let ctx = commands::Context {
        config_file: cli.config,
        node: cli.node,
    };

    match cli.command {
        Commands::Bootstrap => commands::bootstrap::execute(ctx).await,
        Commands::PlaceCerts => commands::place_certs::execute(ctx).await,
        Commands::Identity => commands::identity::execute(&ctx),
    }
}
