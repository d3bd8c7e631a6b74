//! One-time cluster security initialization on the bootstrap host.

use formation_client::api::InstanceAdmin;
use formation_client::{AdminClient, RetryConfig};
use formation_core::Result;
use tracing::{debug, info};

use crate::config::FormationConfig;
use crate::restart::RestartDetector;

/// How the security step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityState {
    /// The pre-flight probe found the host already secured
    AlreadyInitialized,
    /// This run initialized security and saw the host restart
    Initialized,
}

/// Initializes the bootstrap host's admin security exactly once
pub struct SecurityBootstrapper<'a> {
    config: &'a FormationConfig,
    client: &'a AdminClient,
}

impl<'a> SecurityBootstrapper<'a> {
    pub const fn new(config: &'a FormationConfig, client: &'a AdminClient) -> Self {
        Self { config, client }
    }

    pub async fn run(&self) -> Result<SecurityState> {
        if self.initialized().await? {
            info!("security already initialized");
            return Ok(SecurityState::AlreadyInitialized);
        }

        let local = self.config.local_host();
        let detector = RestartDetector::new(self.config, self.client);
        let retry: RetryConfig = self.config.settings.retry.into();

        if let Some(license) = &self.config.topology.license {
            let baseline = detector.capture(local).await;
            let response = self
                .client
                .instance()
                .init(local, Some(license))?
                .retry_matching(&retry, |r| matches!(r.status, 200 | 202 | 204))
                .await
                .into_response("apply license", 202)?;
            if response.status == 202 {
                info!("license applied, waiting for restart");
                detector.confirm(local, baseline.as_ref()).await?;
            } else {
                info!(status = response.status, "license applied");
            }
        }

        let baseline = detector.capture(local).await;
        let payload = InstanceAdmin::new(&self.config.credential, &self.config.topology);
        self.client
            .instance()
            .instance_admin(local, &payload)?
            .retry_until(202, &retry)
            .await
            .into_response("initialize security", 202)?;

        detector.confirm(local, baseline.as_ref()).await?;
        info!(realm = %self.config.topology.realm, "security initialized");
        Ok(SecurityState::Initialized)
    }

    /// Pre-flight: a secured host answers its own properties with 200.
    async fn initialized(&self) -> Result<bool> {
        let host = self.config.bootstrap_host();
        match self.client.hosts().properties(host, host)?.send().await {
            Ok(response) => {
                debug!(status = response.status, "security pre-flight");
                Ok(response.status == 200)
            }
            Err(e) => {
                debug!(error = %e, "security pre-flight found no management listener");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{node_config, FakeCluster, BOOTSTRAP};
    use formation_client::Method;
    use formation_core::{ClusterType, FormationError, License};

    fn bootstrap_config() -> FormationConfig {
        node_config("dnode-0", "dnode", ClusterType::Bootstrap)
    }

    #[tokio::test(start_paused = true)]
    async fn test_initializes_fresh_host() {
        let cluster = FakeCluster::new();
        cluster.add_host(BOOTSTRAP);
        let config = bootstrap_config();
        let client = cluster.client(BOOTSTRAP, &config);

        let state = SecurityBootstrapper::new(&config, &client).run().await.unwrap();

        assert_eq!(state, SecurityState::Initialized);
        assert!(cluster.is_initialized(BOOTSTRAP));
        assert_eq!(cluster.epoch(BOOTSTRAP), 1);
        assert_eq!(cluster.mutations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialized_host_is_left_alone() {
        let cluster = FakeCluster::new();
        cluster.seed_member(BOOTSTRAP, "dnode");
        let config = bootstrap_config();
        let client = cluster.client(BOOTSTRAP, &config);

        let state = SecurityBootstrapper::new(&config, &client).run().await.unwrap();

        assert_eq!(state, SecurityState::AlreadyInitialized);
        assert_eq!(cluster.mutations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_license_restart_is_confirmed_first() {
        let cluster = FakeCluster::new();
        cluster.add_host(BOOTSTRAP);
        let mut config = bootstrap_config();
        config.topology.license = Some(License {
            key: "AAAA-BBBB".to_string(),
            licensee: "Example Corp".to_string(),
        });
        let client = cluster.client(BOOTSTRAP, &config);

        let state = SecurityBootstrapper::new(&config, &client).run().await.unwrap();

        assert_eq!(state, SecurityState::Initialized);
        assert_eq!(cluster.epoch(BOOTSTRAP), 2);
        let posts: Vec<String> = cluster
            .calls()
            .into_iter()
            .filter(|c| c.is_mutating())
            .map(|c| c.path)
            .collect();
        assert_eq!(posts, vec!["/admin/v1/init", "/admin/v1/instance-admin"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_accepted_init_is_fatal() {
        let cluster = FakeCluster::new();
        cluster.add_host(BOOTSTRAP);
        cluster.respond(Method::POST, "/admin/v1/instance-admin", &[500, 500, 500]);
        let mut config = bootstrap_config();
        config.settings.retry.attempts = 3;
        let client = cluster.client(BOOTSTRAP, &config);

        let err = SecurityBootstrapper::new(&config, &client).run().await.unwrap_err();
        assert!(matches!(err, FormationError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(err.status_code(), Some(500));
        assert!(!cluster.is_initialized(BOOTSTRAP));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_init_failures_are_retried() {
        let cluster = FakeCluster::new();
        cluster.add_host(BOOTSTRAP);
        cluster.respond(Method::POST, "/admin/v1/instance-admin", &[503, 0]);
        let config = bootstrap_config();
        let client = cluster.client(BOOTSTRAP, &config);

        let state = SecurityBootstrapper::new(&config, &client).run().await.unwrap();

        assert_eq!(state, SecurityState::Initialized);
        assert!(cluster.is_initialized(BOOTSTRAP));
        let attempts = cluster
            .calls()
            .iter()
            .filter(|c| c.path == "/admin/v1/instance-admin")
            .count();
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_license_failure_is_retried() {
        let cluster = FakeCluster::new();
        cluster.add_host(BOOTSTRAP);
        cluster.respond(Method::POST, "/admin/v1/init", &[503]);
        let mut config = bootstrap_config();
        config.topology.license = Some(License {
            key: "AAAA-BBBB".to_string(),
            licensee: "Example Corp".to_string(),
        });
        let client = cluster.client(BOOTSTRAP, &config);

        let state = SecurityBootstrapper::new(&config, &client).run().await.unwrap();

        assert_eq!(state, SecurityState::Initialized);
        assert_eq!(cluster.epoch(BOOTSTRAP), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_restart_is_fatal() {
        let cluster = FakeCluster::new();
        cluster.add_host(BOOTSTRAP);
        cluster.script_timestamps(BOOTSTRAP, &["T1"; 4]);
        let mut config = bootstrap_config();
        config.settings.retry.attempts = 3;
        let client = cluster.client(BOOTSTRAP, &config);

        let err = SecurityBootstrapper::new(&config, &client).run().await.unwrap_err();
        assert!(matches!(err, FormationError::RestartNotObserved { attempts: 3, .. }));
    }
}
