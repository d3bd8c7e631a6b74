//! Runtime configuration for a formation run.
//!
//! Inputs that identify the node and the cluster arrive from the platform
//! (environment or flags); tunables come from an optional TOML file. Both
//! are folded into one immutable [`FormationConfig`] that every component
//! borrows.

use formation_client::{AdminClient, AdminPorts, RetryConfig};
use formation_core::{AdminCredential, CertificateMode, ClusterTopology, FormationError, NodeIdentity, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name of the copied operator CA bundle inside the trust directory
pub const TRUSTED_CA_FILE: &str = "formation-ca.crt";

/// File name of the probed bootstrap CA chain inside the trust directory
pub const PROBED_CA_FILE: &str = "bootstrap-ca.pem";

/// Everything a formation run needs, fixed for its lifetime
#[derive(Debug, Clone)]
pub struct FormationConfig {
    /// Who this node is
    pub identity: NodeIdentity,

    /// The cluster it belongs to
    pub topology: ClusterTopology,

    /// Shared admin credential
    pub credential: AdminCredential,

    /// Switch admin endpoints to basic auth for path-based routing
    pub path_based_routing: bool,

    /// Tunables
    pub settings: Settings,
}

impl FormationConfig {
    /// Configuration with default tunables
    #[must_use]
    pub fn new(identity: NodeIdentity, topology: ClusterTopology, credential: AdminCredential) -> Self {
        Self {
            identity,
            topology,
            credential,
            path_based_routing: false,
            settings: Settings::default(),
        }
    }

    /// Replace the tunables
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Host name the node uses to reach its own admin listeners
    #[must_use]
    pub fn local_host(&self) -> &str {
        &self.settings.local_address
    }

    /// The bootstrap host's FQDN
    #[must_use]
    pub fn bootstrap_host(&self) -> &str {
        &self.topology.bootstrap_host
    }

    /// True if this node initializes the cluster
    #[must_use]
    pub fn establishes_cluster(&self) -> bool {
        self.identity.establishes_cluster(&self.topology)
    }

    /// Build the admin client for this node.
    ///
    /// When TLS-join is enabled, joiners talk HTTPS to the bootstrap host and
    /// trust whatever CA material phase A left in the trust directory.
    pub fn admin_client(&self) -> Result<AdminClient> {
        let mut builder = AdminClient::builder(self.credential.clone())
            .timeout(Duration::from_secs(self.settings.request_timeout_secs))
            .ports(self.settings.ports);

        if self.topology.join_tls_enabled && !self.establishes_cluster() {
            builder = builder.secure_host(self.topology.bootstrap_host.clone());

            for name in [TRUSTED_CA_FILE, PROBED_CA_FILE] {
                let path = self.settings.tls.trust_dir.join(name);
                if path.exists() {
                    debug!(path = %path.display(), "trusting CA material");
                    let pem = std::fs::read(&path)
                        .map_err(|e| FormationError::io(path.display().to_string(), e))?;
                    builder = builder.trust_pem(pem);
                }
            }
        }

        builder.build()
    }
}

/// Tunables, loadable from TOML. Every field has a reference default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Generic bounded polling (restart confirmation and friends)
    #[serde(default)]
    pub retry: RetrySettings,

    /// Readiness polling delays
    #[serde(default)]
    pub readiness: ReadinessSettings,

    /// Join handshake tunables
    #[serde(default)]
    pub join: JoinSettings,

    /// Admin listener ports
    #[serde(default)]
    pub ports: AdminPorts,

    /// Certificate provisioning
    #[serde(default)]
    pub tls: TlsSettings,

    /// Per-call HTTP timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Address the node uses for its own admin listeners
    #[serde(default = "default_local_address")]
    pub local_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry: RetrySettings::default(),
            readiness: ReadinessSettings::default(),
            join: JoinSettings::default(),
            ports: AdminPorts::default(),
            tls: TlsSettings::default(),
            request_timeout_secs: default_request_timeout(),
            local_address: default_local_address(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| FormationError::io(path.display().to_string(), e))?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FormationError::Config(e.to_string()))
    }
}

/// Attempts and spacing of a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts
    pub attempts: u32,

    /// Delay between attempts (milliseconds)
    pub interval_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 60,
            interval_ms: 1_000,
        }
    }
}

impl From<RetrySettings> for RetryConfig {
    fn from(settings: RetrySettings) -> Self {
        Self::new()
            .attempts(settings.attempts)
            .interval(Duration::from_millis(settings.interval_ms))
    }
}

/// Delays of the unbounded readiness polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessSettings {
    /// Delay between local liveness polls (seconds)
    #[serde(default = "default_local_delay")]
    pub local_delay_secs: u64,

    /// Delay between bootstrap-host polls (seconds)
    #[serde(default = "default_remote_delay")]
    pub remote_delay_secs: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            local_delay_secs: default_local_delay(),
            remote_delay_secs: default_remote_delay(),
        }
    }
}

/// Whether a join waits for the joiner's restart to be observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinConfirmation {
    /// Poll the restart epoch after applying the cluster config
    Always,
    /// Trust the 202 and finish immediately
    Skip,
}

/// Join handshake tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSettings {
    /// Wait for the target group to exist
    #[serde(default = "default_group_wait")]
    pub group_wait: RetrySettings,

    /// Delay before re-checking membership after an inconclusive answer
    /// (seconds)
    #[serde(default = "default_recheck_delay")]
    pub recheck_delay_secs: u64,

    /// Restart confirmation policy
    #[serde(default = "default_confirmation")]
    pub confirm_restart: JoinConfirmation,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            group_wait: default_group_wait(),
            recheck_delay_secs: default_recheck_delay(),
            confirm_restart: default_confirmation(),
        }
    }
}

/// Certificate provisioning settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    /// Named (mounted) or engine-generated certificates
    #[serde(default = "default_cert_mode")]
    pub mode: CertificateMode,

    /// Certificate template securing the admin servers
    #[serde(default = "default_template")]
    pub template_name: String,

    /// Organization written into the template's subject
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Validity of engine-generated certificates (days)
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    /// Where named certificates and the CA are mounted
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// CA bundle file name inside `source_dir`
    #[serde(default = "default_ca_file")]
    pub ca_file: String,

    /// System trust anchor directory
    #[serde(default = "default_trust_dir")]
    pub trust_dir: PathBuf,

    /// Where the selected certificate and key are placed
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Timeout of the CA probe handshake (seconds)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            mode: default_cert_mode(),
            template_name: default_template(),
            organization: default_organization(),
            validity_days: default_validity_days(),
            source_dir: default_source_dir(),
            ca_file: default_ca_file(),
            trust_dir: default_trust_dir(),
            output_dir: default_output_dir(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl TlsSettings {
    /// Path of the placed certificate
    #[must_use]
    pub fn placed_cert(&self) -> PathBuf {
        self.output_dir.join("tls.crt")
    }

    /// Path of the placed private key
    #[must_use]
    pub fn placed_key(&self) -> PathBuf {
        self.output_dir.join("tls.key")
    }
}

// Default value functions for serde.
const fn default_request_timeout() -> u64 {
    15
}

fn default_local_address() -> String {
    String::from("localhost")
}

const fn default_local_delay() -> u64 {
    5
}

const fn default_remote_delay() -> u64 {
    10
}

const fn default_group_wait() -> RetrySettings {
    RetrySettings {
        attempts: 10,
        interval_ms: 10_000,
    }
}

const fn default_recheck_delay() -> u64 {
    10
}

const fn default_confirmation() -> JoinConfirmation {
    JoinConfirmation::Always
}

const fn default_cert_mode() -> CertificateMode {
    CertificateMode::SelfSigned
}

fn default_template() -> String {
    String::from("defaultTemplate")
}

fn default_organization() -> String {
    String::from("Formation")
}

const fn default_validity_days() -> u32 {
    365
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("/tmp/server-cert-secrets")
}

fn default_ca_file() -> String {
    String::from("ca.crt")
}

fn default_trust_dir() -> PathBuf {
    PathBuf::from("/etc/pki/ca-trust/source/anchors")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/run/formation/certs")
}

const fn default_probe_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use formation_core::ClusterType;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(RetryConfig::from(settings.retry), RetryConfig::new());
        assert_eq!(settings.readiness.local_delay_secs, 5);
        assert_eq!(settings.readiness.remote_delay_secs, 10);
        assert_eq!(settings.join.group_wait.attempts, 10);
        assert_eq!(settings.join.confirm_restart, JoinConfirmation::Always);
        assert_eq!(settings.ports.manage, 8002);
        assert_eq!(settings.tls.template_name, "defaultTemplate");
        assert_eq!(settings.tls.placed_key(), PathBuf::from("/run/formation/certs/tls.key"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            request_timeout_secs = 30

            [retry]
            attempts = 5
            interval_ms = 200

            [join]
            confirm_restart = "skip"

            [tls]
            mode = "named"
            "#,
        )
        .unwrap();

        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.join.confirm_restart, JoinConfirmation::Skip);
        assert_eq!(settings.join.recheck_delay_secs, 10);
        assert_eq!(settings.tls.mode, CertificateMode::Named);
        assert_eq!(settings.tls.ca_file, "ca.crt");
        assert_eq!(settings.readiness, ReadinessSettings::default());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(
            Settings::from_toml("retry = 3"),
            Err(FormationError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/formation.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_joiner_talks_https_to_bootstrap_under_tls() {
        let mut topology = ClusterTopology::new("dnode-0.dnode.local", "dnode", ClusterType::Bootstrap);
        topology.join_tls_enabled = true;
        let credential = AdminCredential::new("admin", "pw").unwrap();

        let joiner = NodeIdentity::derive("dnode-1", Some("dnode.local"), ClusterType::Bootstrap).unwrap();
        let mut config = FormationConfig::new(joiner, topology.clone(), credential.clone());
        config.settings.tls.trust_dir = PathBuf::from("/nonexistent");
        assert!(config.admin_client().unwrap().is_secure("dnode-0.dnode.local"));

        let bootstrap = NodeIdentity::derive("dnode-0", Some("dnode.local"), ClusterType::Bootstrap).unwrap();
        let config = FormationConfig::new(bootstrap, topology, credential);
        assert!(!config.admin_client().unwrap().is_secure("dnode-0.dnode.local"));
    }
}
