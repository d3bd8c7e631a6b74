//! `formation bootstrap` - run the formation protocol for this node.

use anyhow::{Context as _, Result};
use formation::{Coordinator, EntryPath};
use tracing::info;

use super::Context;

pub async fn execute(ctx: Context) -> Result<()> {
    let config = ctx.formation_config()?;
    let client = config.admin_client()?;

    let mut coordinator = Coordinator::new(&config, &client);
    let result = coordinator.run().await;
    let report = result.with_context(|| {
        let phase = coordinator.failed_in().unwrap_or_else(|| coordinator.phase());
        format!("formation failed in phase {phase}")
    })?;

    match report.path {
        EntryPath::Bootstrap { security, group } => {
            info!(?security, ?group, "cluster bootstrap complete");
        }
        EntryPath::Join { group, join } => {
            info!(?group, ?join, "cluster join complete");
        }
    }
    if let Some(servers) = report.basic_auth_servers {
        info!(servers, "admin servers on basic auth");
    }
    if let Some(activation) = report.activation {
        info!(?activation, "TLS certificate active");
    }
    Ok(())
}
