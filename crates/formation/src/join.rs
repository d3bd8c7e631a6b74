//! Join handshake for every node that does not establish the cluster.
//!
//! The joiner hands its own server configuration to the bootstrap host,
//! receives a cluster configuration archive in return and applies it
//! locally, which restarts the joiner as a cluster member.

use formation_client::{AdminClient, RetryConfig};
use formation_core::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{FormationConfig, JoinConfirmation};
use crate::restart::RestartDetector;

/// How the join ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    /// The bootstrap host already lists this node
    AlreadyJoined,
    /// This run joined the node
    Joined,
}

/// Drives the join handshake
pub struct JoinOrchestrator<'a> {
    config: &'a FormationConfig,
    client: &'a AdminClient,
}

impl<'a> JoinOrchestrator<'a> {
    pub const fn new(config: &'a FormationConfig, client: &'a AdminClient) -> Self {
        Self { config, client }
    }

    pub async fn run(&self) -> Result<JoinState> {
        if self.is_member().await? {
            info!("already a cluster member");
            return Ok(JoinState::AlreadyJoined);
        }

        self.wait_for_group().await?;

        let bootstrap = self.config.bootstrap_host();
        let local = self.config.local_host();
        let group = &self.config.topology.group_name;
        let retry: RetryConfig = self.config.settings.retry.into();

        let response = self
            .client
            .cluster()
            .server_config(local)?
            .retry_until(200, &retry)
            .await
            .into_response("fetch server config", 200)?;
        let server_config = response.text().into_owned();

        let archive = self
            .client
            .cluster()
            .cluster_config_archive(bootstrap, group, &server_config)?
            .retry_until(200, &retry)
            .await
            .into_response("request cluster config", 200)?;
        debug!(bytes = archive.body.len(), "received cluster config archive");

        let detector = RestartDetector::new(self.config, self.client);
        let baseline = detector.capture(local).await;

        self.client
            .cluster()
            .apply_cluster_config(local, archive.body)?
            .retry_until(202, &retry)
            .await
            .into_response("apply cluster config", 202)?;

        match self.config.settings.join.confirm_restart {
            JoinConfirmation::Always => {
                detector.confirm(local, baseline.as_ref()).await?;
            }
            JoinConfirmation::Skip => debug!("not waiting for restart"),
        }

        info!(%group, %bootstrap, "joined cluster");
        Ok(JoinState::Joined)
    }

    /// Ask the bootstrap host whether it already lists this node: 200 means
    /// joined, 404 means not. Anything else is inconclusive and re-checked
    /// without bound.
    async fn is_member(&self) -> Result<bool> {
        let bootstrap = self.config.bootstrap_host();
        let fqdn = self.config.identity.fqdn();
        let delay = Duration::from_secs(self.config.settings.join.recheck_delay_secs);

        loop {
            match self.client.hosts().properties(bootstrap, fqdn)?.send().await {
                Ok(response) if response.status == 200 => return Ok(true),
                Ok(response) if response.status == 404 => return Ok(false),
                Ok(response) => debug!(status = response.status, "membership check inconclusive"),
                Err(e) => debug!(error = %e, "membership check failed"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn wait_for_group(&self) -> Result<()> {
        let group = &self.config.topology.group_name;
        let retry: RetryConfig = self.config.settings.join.group_wait.into();

        let outcome = self
            .client
            .groups()
            .get(self.config.bootstrap_host(), group)?
            .retry_until(200, &retry)
            .await;
        let attempts = outcome.attempts();
        outcome.into_response(&format!("wait for group {group}"), 200)?;

        debug!(%group, attempts, "target group present");
        Ok(())
    }
}
