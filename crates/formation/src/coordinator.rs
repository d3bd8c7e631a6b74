//! Top-level sequencing of a node's formation run.

use formation_client::AdminClient;
use formation_core::Result;
use std::fmt;
use tracing::{info, info_span, Instrument};

use crate::certs::{Activation, CertificateActivator};
use crate::config::FormationConfig;
use crate::group::{GroupConfigurator, GroupReport};
use crate::join::{JoinOrchestrator, JoinState};
use crate::readiness::ReadinessProber;
use crate::security::{SecurityBootstrapper, SecurityState};
use crate::servers::ServerSwitcher;

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    WaitingLocalReady,
    BootstrapPath,
    JoinPath,
    PostJoinAuthConfig,
    TlsConfig,
    Done,
    /// A step returned an error; see [`Coordinator::failed_in`]
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::WaitingLocalReady => "local-ready",
            Self::BootstrapPath => "bootstrap",
            Self::JoinPath => "join",
            Self::PostJoinAuthConfig => "auth-config",
            Self::TlsConfig => "tls-activate",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Which way the node entered the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPath {
    /// Initialized security and the bootstrap group
    Bootstrap {
        security: SecurityState,
        group: GroupReport,
    },
    /// Joined an existing cluster
    Join {
        /// Present on designated instances only
        group: Option<GroupReport>,
        join: JoinState,
    },
}

/// Everything a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorReport {
    pub path: EntryPath,
    /// Admin servers switched to basic auth, if the switch ran
    pub basic_auth_servers: Option<usize>,
    /// Certificate activation, if TLS joins are enabled
    pub activation: Option<Activation>,
}

/// Runs the whole protocol for one node
pub struct Coordinator<'a> {
    config: &'a FormationConfig,
    client: &'a AdminClient,
    phase: Phase,
    failed_in: Option<Phase>,
}

impl<'a> Coordinator<'a> {
    pub const fn new(config: &'a FormationConfig, client: &'a AdminClient) -> Self {
        Self {
            config,
            client,
            phase: Phase::Starting,
            failed_in: None,
        }
    }

    /// The phase the coordinator is in
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The phase that was running when the run failed
    pub const fn failed_in(&self) -> Option<Phase> {
        self.failed_in
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    pub async fn run(&mut self) -> Result<CoordinatorReport> {
        let result = self.drive().await;
        if result.is_err() {
            self.failed_in = Some(self.phase);
            self.enter(Phase::Failed);
        }
        result
    }

    async fn drive(&mut self) -> Result<CoordinatorReport> {
        let config = self.config;
        let client = self.client;
        let identity = &config.identity;
        info!(
            fqdn = identity.fqdn(),
            ordinal = identity.ordinal(),
            bootstrap_role = identity.is_bootstrap_role(),
            group = %config.topology.group_name,
            "starting cluster formation"
        );

        self.enter(Phase::WaitingLocalReady);
        ReadinessProber::new(config, client)
            .wait_local()
            .instrument(info_span!("phase", name = "local-ready"))
            .await?;

        let path = if config.establishes_cluster() {
            self.enter(Phase::BootstrapPath);
            let security = SecurityBootstrapper::new(config, client)
                .run()
                .instrument(info_span!("phase", name = "security"))
                .await?;
            let group = GroupConfigurator::new(config, client)
                .run()
                .instrument(info_span!("phase", name = "group"))
                .await?;
            EntryPath::Bootstrap { security, group }
        } else {
            self.enter(Phase::JoinPath);
            ReadinessProber::new(config, client)
                .wait_remote()
                .instrument(info_span!("phase", name = "remote-ready"))
                .await?;
            let group = if identity.is_designated() {
                Some(
                    GroupConfigurator::new(config, client)
                        .run()
                        .instrument(info_span!("phase", name = "group"))
                        .await?,
                )
            } else {
                None
            };
            let join = JoinOrchestrator::new(config, client)
                .run()
                .instrument(info_span!("phase", name = "join"))
                .await?;
            EntryPath::Join { group, join }
        };

        let basic_auth_servers = if config.path_based_routing && identity.is_designated() {
            self.enter(Phase::PostJoinAuthConfig);
            Some(
                ServerSwitcher::new(config, client)
                    .use_basic_auth()
                    .instrument(info_span!("phase", name = "auth-config"))
                    .await?,
            )
        } else {
            None
        };

        let activation = if config.topology.join_tls_enabled {
            self.enter(Phase::TlsConfig);
            Some(
                CertificateActivator::new(config, client)
                    .run()
                    .instrument(info_span!("phase", name = "tls-activate"))
                    .await?,
            )
        } else {
            None
        };

        self.enter(Phase::Done);
        Ok(CoordinatorReport {
            path,
            basic_auth_servers,
            activation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{GroupCreation, PropertyUpdate};
    use crate::testing::{node_config, FakeCluster, BOOTSTRAP};
    use formation_core::{ClusterType, FormationError};
    use std::sync::Arc;

    const DNODE_1: &str = "dnode-1.dnode.db.local";
    const ENODE_0: &str = "enode-0.enode.db.local";
    const ENODE_1: &str = "enode-1.enode.db.local";

    async fn run_node(cluster: &Arc<FakeCluster>, hostname: &str, group: &str, cluster_type: ClusterType) -> Result<CoordinatorReport> {
        let config = node_config(hostname, group, cluster_type);
        let client = cluster.client(config.identity.fqdn(), &config);
        Coordinator::new(&config, &client).run().await
    }

    fn started_cluster() -> Arc<FakeCluster> {
        let cluster = FakeCluster::new();
        for host in [BOOTSTRAP, DNODE_1, ENODE_0, ENODE_1] {
            cluster.add_host(host);
        }
        cluster
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_forms_and_reruns_without_mutations() {
        let cluster = started_cluster();

        let report = run_node(&cluster, "dnode-0", "dnode", ClusterType::Bootstrap).await.unwrap();
        assert_eq!(
            report.path,
            EntryPath::Bootstrap {
                security: SecurityState::Initialized,
                group: GroupReport {
                    update: PropertyUpdate::Applied,
                    creation: GroupCreation::NotApplicable,
                },
            }
        );
        assert_eq!(cluster.group_of(BOOTSTRAP).as_deref(), Some("dnode"));

        let report = run_node(&cluster, "dnode-1", "dnode", ClusterType::Bootstrap).await.unwrap();
        assert_eq!(report.path, EntryPath::Join { group: None, join: JoinState::Joined });

        let report = run_node(&cluster, "enode-0", "enode", ClusterType::NonBootstrap).await.unwrap();
        assert!(matches!(
            report.path,
            EntryPath::Join {
                group: Some(GroupReport { creation: GroupCreation::Created, .. }),
                join: JoinState::Joined,
            }
        ));
        assert_eq!(cluster.group_of(DNODE_1).as_deref(), Some("dnode"));
        assert_eq!(cluster.group_of(ENODE_0).as_deref(), Some("enode"));

        let before = cluster.mutations();
        run_node(&cluster, "dnode-0", "dnode", ClusterType::Bootstrap).await.unwrap();
        let report = run_node(&cluster, "dnode-1", "dnode", ClusterType::Bootstrap).await.unwrap();
        assert_eq!(report.path, EntryPath::Join { group: None, join: JoinState::AlreadyJoined });
        run_node(&cluster, "enode-0", "enode", ClusterType::NonBootstrap).await.unwrap();
        assert_eq!(cluster.mutations(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_joiner_fails_until_its_group_exists() {
        let cluster = started_cluster();
        run_node(&cluster, "dnode-0", "dnode", ClusterType::Bootstrap).await.unwrap();

        let err = run_node(&cluster, "enode-1", "enode", ClusterType::NonBootstrap).await.unwrap_err();
        assert!(matches!(err, FormationError::RetriesExhausted { .. }));
        assert_eq!(cluster.group_of(ENODE_1), None);

        run_node(&cluster, "enode-0", "enode", ClusterType::NonBootstrap).await.unwrap();
        run_node(&cluster, "enode-1", "enode", ClusterType::NonBootstrap).await.unwrap();
        assert_eq!(cluster.group_of(ENODE_1).as_deref(), Some("enode"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_designated_node_switches_auth_and_tls() {
        let cluster = started_cluster();
        let mut config = node_config("dnode-0", "dnode", ClusterType::Bootstrap);
        config.path_based_routing = true;
        config.topology.join_tls_enabled = true;
        let out = tempfile::TempDir::new().unwrap();
        config.settings.tls.output_dir = out.path().to_path_buf();
        let client = cluster.client(BOOTSTRAP, &config);

        let mut coordinator = Coordinator::new(&config, &client);
        let report = coordinator.run().await.unwrap();

        assert_eq!(coordinator.phase(), Phase::Done);
        assert_eq!(report.basic_auth_servers, Some(3));
        assert_eq!(report.activation, Some(Activation::Generated));
        let manage = cluster.server("Manage").unwrap();
        assert_eq!(manage["authentication"], "basic");
        assert_eq!(manage["ssl-certificate-template"], "defaultTemplate");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_records_failed_phase() {
        let cluster = started_cluster();
        let config = node_config("dnode-1", "dnode", ClusterType::Bootstrap);
        cluster.seed_member(BOOTSTRAP, "dnode");
        cluster.respond(formation_client::Method::GET, "/admin/v1/server-config", &[500, 500, 500]);
        let mut config = config;
        config.settings.retry.attempts = 3;
        let client = cluster.client(DNODE_1, &config);

        let mut coordinator = Coordinator::new(&config, &client);
        let err = coordinator.run().await.unwrap_err();

        assert_eq!(err.status_code(), Some(500));
        assert_eq!(coordinator.phase(), Phase::Failed);
        assert_eq!(coordinator.failed_in(), Some(Phase::JoinPath));
        assert_eq!(Phase::Failed.to_string(), "failed");
    }
}
