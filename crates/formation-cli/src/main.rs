//! formation - cluster formation lifecycle hook
//!
//! Runs once per node and exits 0 when the node is a configured cluster
//! member, 1 otherwise.

use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match formation_cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
