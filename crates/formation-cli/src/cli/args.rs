//! Command-line argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use formation::{CertificateMode, ClusterType};
use std::path::PathBuf;

/// Form a database cluster from this node.
///
/// Runs as a lifecycle hook on every node. Inputs normally arrive as
/// environment variables set by the orchestration platform.
#[derive(Parser, Debug)]
#[command(name = "formation")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML file with retry, port and certificate tunables
    #[arg(short, long, env = "FORMATION_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub node: NodeArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the formation protocol: readiness, security or join, group, TLS
    Bootstrap,

    /// Select, verify and place TLS material before the node serves
    PlaceCerts,

    /// Print the identity this node derives, as JSON
    Identity,
}

/// Where this node sits in the cluster
#[derive(Args, Debug, Clone, Default)]
pub struct NodeArgs {
    /// Instance hostname; its numeric suffix is the ordinal
    #[arg(long, env = "HOSTNAME", global = true)]
    pub hostname: Option<String>,

    /// Domain appended to an unqualified hostname
    #[arg(long, env = "FORMATION_FQDN_SUFFIX", global = true)]
    pub fqdn_suffix: Option<String>,

    /// FQDN of the host that initializes the cluster
    #[arg(long, env = "FORMATION_BOOTSTRAP_HOST", global = true)]
    pub bootstrap_host: Option<String>,

    /// Node-group this node belongs to
    #[arg(long, env = "FORMATION_GROUP", global = true)]
    pub group: Option<String>,

    /// Whether this node-group hosts the bootstrap node
    #[arg(long, env = "FORMATION_CLUSTER_TYPE", global = true, default_value = "bootstrap")]
    pub cluster_type: ClusterType,

    /// Encrypt XDQP traffic within the group
    #[arg(long, env = "FORMATION_XDQP_SSL_ENABLED", global = true, action = ArgAction::Set, default_value_t = false)]
    pub xdqp_ssl: bool,

    /// Join the cluster over TLS and activate certificates
    #[arg(long, env = "FORMATION_JOIN_TLS_ENABLED", global = true, action = ArgAction::Set, default_value_t = false)]
    pub join_tls: bool,

    /// Certificate source, overriding the config file
    #[arg(long, env = "FORMATION_CERT_MODE", global = true)]
    pub cert_mode: Option<CertificateMode>,

    /// Switch admin servers to basic auth for path-based routing
    #[arg(long, env = "FORMATION_PATH_BASED_ROUTING", global = true, action = ArgAction::Set, default_value_t = false)]
    pub path_based_routing: bool,

    /// Security realm set at initialization
    #[arg(long, env = "FORMATION_REALM", global = true, default_value = "public")]
    pub realm: String,

    #[command(flatten)]
    pub secrets: SecretArgs,
}

/// Secrets, inline or as mounted files
#[derive(Args, Debug, Clone, Default)]
pub struct SecretArgs {
    /// Admin username
    #[arg(long, env = "FORMATION_ADMIN_USERNAME", global = true, hide_env_values = true)]
    pub admin_username: Option<String>,

    /// File holding the admin username
    #[arg(long, env = "FORMATION_ADMIN_USERNAME_FILE", global = true)]
    pub admin_username_file: Option<PathBuf>,

    /// Admin password
    #[arg(long, env = "FORMATION_ADMIN_PASSWORD", global = true, hide_env_values = true)]
    pub admin_password: Option<String>,

    /// File holding the admin password
    #[arg(long, env = "FORMATION_ADMIN_PASSWORD_FILE", global = true)]
    pub admin_password_file: Option<PathBuf>,

    /// License key applied at initialization
    #[arg(long, env = "FORMATION_LICENSE_KEY", global = true, hide_env_values = true)]
    pub license_key: Option<String>,

    /// File holding the license key
    #[arg(long, env = "FORMATION_LICENSE_KEY_FILE", global = true)]
    pub license_key_file: Option<PathBuf>,

    /// Licensee the license key was issued to
    #[arg(long, env = "FORMATION_LICENSEE", global = true)]
    pub licensee: Option<String>,

    /// Wallet password set at initialization
    #[arg(long, env = "FORMATION_WALLET_PASSWORD", global = true, hide_env_values = true)]
    pub wallet_password: Option<String>,

    /// File holding the wallet password
    #[arg(long, env = "FORMATION_WALLET_PASSWORD_FILE", global = true)]
    pub wallet_password_file: Option<PathBuf>,
}
