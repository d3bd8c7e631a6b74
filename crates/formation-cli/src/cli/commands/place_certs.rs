//! `formation place-certs` - lay out TLS material before the node serves.

use anyhow::Result;
use formation::certs::{CertificatePlacer, Placement};
use tracing::{info, info_span, Instrument};

use super::Context;

pub async fn execute(ctx: Context) -> Result<()> {
    let config = ctx.formation_config()?;

    let placement = CertificatePlacer::new(&config)
        .place()
        .instrument(info_span!("phase", name = "tls-place"))
        .await?;

    match placement {
        Placement::Disabled => info!("TLS joins disabled, nothing placed"),
        Placement::Named { cert, key } => {
            info!(cert = %cert.display(), key = %key.display(), "named certificate placed");
        }
        Placement::Temporary { probed_ca } => {
            info!(
                probed_ca = probed_ca.as_ref().map(|p| p.display().to_string()),
                "engine will generate a temporary certificate"
            );
        }
    }
    Ok(())
}
