//! Local and remote liveness polling.
//!
//! Both polls are unbounded: nothing can progress until the node (or the
//! bootstrap host) answers, and a bound would only turn a slow start into
//! a crash loop.

use formation_client::AdminClient;
use formation_core::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::FormationConfig;

/// Waits for admin listeners to come up
pub struct ReadinessProber<'a> {
    config: &'a FormationConfig,
    client: &'a AdminClient,
}

impl<'a> ReadinessProber<'a> {
    pub const fn new(config: &'a FormationConfig, client: &'a AdminClient) -> Self {
        Self { config, client }
    }

    /// Poll this node's timestamp endpoint until it returns a non-empty
    /// body. Returns the number of polls made.
    pub async fn wait_local(&self) -> Result<u32> {
        let host = self.config.local_host();
        let delay = Duration::from_secs(self.config.settings.readiness.local_delay_secs);
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self.client.hosts().timestamp(host)?.send().await {
                Ok(response) if response.is_success() && !response.text().trim().is_empty() => {
                    info!(polls, "local admin listener is up");
                    return Ok(polls);
                }
                Ok(response) => debug!(status = response.status, polls, "local node not ready"),
                Err(e) => debug!(error = %e, polls, "local node not reachable"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Poll the bootstrap host until it answers an unauthenticated request
    /// with its auth challenge: 403 when joins run over TLS, 401 otherwise.
    pub async fn wait_remote(&self) -> Result<u32> {
        let host = self.config.bootstrap_host();
        let expected = if self.config.topology.join_tls_enabled { 403 } else { 401 };
        let delay = Duration::from_secs(self.config.settings.readiness.remote_delay_secs);
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self.client.hosts().challenge_probe(host)?.send().await {
                Ok(response) if response.status == expected => {
                    info!(host, polls, "bootstrap host is up");
                    return Ok(polls);
                }
                Ok(response) => debug!(host, status = response.status, expected, polls, "bootstrap host not ready"),
                Err(e) => debug!(host, error = %e, polls, "bootstrap host not reachable"),
            }
            tokio::time::sleep(delay).await;
        }
    }
}
