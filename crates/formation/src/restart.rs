//! Restart confirmation via the node's last-startup token.
//!
//! A 202 from the admin API only promises a restart; the server may answer
//! before it reloads. The detector captures the token before the mutating
//! call and polls until a different one appears.

use formation_client::{AdminClient, RetryConfig, RetryOutcome};
use formation_core::{FormationError, RestartEpoch, Result};
use tracing::{debug, info};

use crate::config::FormationConfig;

/// Observes node restarts
pub struct RestartDetector<'a> {
    client: &'a AdminClient,
    retry: RetryConfig,
}

impl<'a> RestartDetector<'a> {
    pub fn new(config: &FormationConfig, client: &'a AdminClient) -> Self {
        Self {
            client,
            retry: config.settings.retry.into(),
        }
    }

    /// Read the current token of `host` once. An unreachable host or an
    /// empty reply yields no baseline.
    pub async fn capture(&self, host: &str) -> Option<RestartEpoch> {
        let call = self.client.hosts().timestamp(host).ok()?;
        match call.send().await {
            Ok(response) if response.is_success() => {
                let epoch = RestartEpoch::from_response(&response.text());
                debug!(host, epoch = ?epoch.as_ref().map(RestartEpoch::as_str), "captured restart baseline");
                epoch
            }
            Ok(response) => {
                debug!(host, status = response.status, "no restart baseline");
                None
            }
            Err(e) => {
                debug!(host, error = %e, "no restart baseline");
                None
            }
        }
    }

    /// Poll `host` until it reports a token different from `baseline`.
    pub async fn confirm(&self, host: &str, baseline: Option<&RestartEpoch>) -> Result<RestartEpoch> {
        let outcome = self
            .client
            .hosts()
            .timestamp(host)?
            .retry_matching(&self.retry, |response| {
                response.is_success()
                    && RestartEpoch::superseded_by(baseline, RestartEpoch::from_response(&response.text()).as_ref())
            })
            .await;

        match outcome {
            RetryOutcome::Matched { response, attempts } => {
                let epoch = RestartEpoch::from_response(&response.text())
                    .ok_or_else(|| FormationError::Internal("accepted an empty restart token".to_string()))?;
                info!(host, %epoch, attempts, "restart confirmed");
                Ok(epoch)
            }
            RetryOutcome::Exhausted { attempts, .. } => Err(FormationError::RestartNotObserved {
                host: host.to_string(),
                attempts,
            }),
        }
    }
}
