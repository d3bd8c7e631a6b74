use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FormationError;

/// Whether a node-group hosts the cluster's bootstrap node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterType {
    /// The group whose ordinal 0 initializes the cluster
    #[default]
    Bootstrap,
    /// Any other group; joins an existing cluster
    NonBootstrap,
}

impl FromStr for ClusterType {
    type Err = FormationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bootstrap" => Ok(Self::Bootstrap),
            "non-bootstrap" | "nonbootstrap" | "non_bootstrap" => Ok(Self::NonBootstrap),
            other => Err(FormationError::Config(format!("unknown cluster type {other:?}"))),
        }
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::NonBootstrap => write!(f, "non-bootstrap"),
        }
    }
}

/// License applied during first-time initialization
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License key
    #[serde(rename = "license-key")]
    pub key: String,

    /// Licensee name
    pub licensee: String,
}

impl fmt::Debug for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("License")
            .field("key", &"<redacted>")
            .field("licensee", &self.licensee)
            .finish()
    }
}

/// Read-only description of the cluster this node belongs to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopology {
    /// FQDN of the host that initializes the cluster and answers joins
    pub bootstrap_host: String,

    /// Node-group this node belongs to
    pub group_name: String,

    /// Whether this node-group is the cluster-bootstrap group
    pub cluster_type: ClusterType,

    /// Encrypt inter-node (XDQP) traffic
    #[serde(default)]
    pub xdqp_ssl_enabled: bool,

    /// Serve the admin endpoints over TLS once formed
    #[serde(default)]
    pub join_tls_enabled: bool,

    /// Optional license applied at initialization
    #[serde(default)]
    pub license: Option<License>,

    /// Security realm
    #[serde(default = "default_realm")]
    pub realm: String,

    /// Optional wallet password set at initialization
    #[serde(default)]
    pub wallet_password: Option<String>,
}

fn default_realm() -> String {
    String::from("public")
}

impl ClusterTopology {
    /// Topology with the given essentials and everything else defaulted
    pub fn new(bootstrap_host: impl Into<String>, group_name: impl Into<String>, cluster_type: ClusterType) -> Self {
        Self {
            bootstrap_host: bootstrap_host.into(),
            group_name: group_name.into(),
            cluster_type,
            xdqp_ssl_enabled: false,
            join_tls_enabled: false,
            license: None,
            realm: default_realm(),
            wallet_password: None,
        }
    }

    /// True if this node-group is the cluster-bootstrap group
    #[must_use]
    pub fn is_bootstrap_group(&self) -> bool {
        self.cluster_type == ClusterType::Bootstrap
    }
}

impl fmt::Debug for ClusterTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterTopology")
            .field("bootstrap_host", &self.bootstrap_host)
            .field("group_name", &self.group_name)
            .field("cluster_type", &self.cluster_type)
            .field("xdqp_ssl_enabled", &self.xdqp_ssl_enabled)
            .field("join_tls_enabled", &self.join_tls_enabled)
            .field("license", &self.license)
            .field("realm", &self.realm)
            .field("wallet_password", &self.wallet_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
