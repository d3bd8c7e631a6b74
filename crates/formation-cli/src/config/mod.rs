//! Assembles the immutable run configuration from CLI inputs.

use anyhow::{bail, Context as _, Result};
use formation::{
    AdminCredential, ClusterTopology, FormationConfig, License, NodeIdentity, Settings,
};
use std::path::{Path, PathBuf};

use crate::cli::args::{NodeArgs, SecretArgs};

/// Resolve a secret given inline or through a mounted file.
///
/// The inline value wins. File contents lose one trailing newline.
pub fn resolve_secret(value: Option<&str>, file: Option<&Path>) -> Result<Option<String>> {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        return Ok(Some(value.to_string()));
    }
    let Some(path) = file else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading secret file {}", path.display()))?;
    let trimmed = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(&raw);
    Ok(Some(trimmed.to_string()).filter(|s| !s.is_empty()))
}

/// Admin credential from the secret inputs
pub fn credential(secrets: &SecretArgs) -> Result<AdminCredential> {
    let username = resolve_secret(
        secrets.admin_username.as_deref(),
        secrets.admin_username_file.as_deref(),
    )?
    .unwrap_or_default();
    let password = resolve_secret(
        secrets.admin_password.as_deref(),
        secrets.admin_password_file.as_deref(),
    )?
    .unwrap_or_default();
    Ok(AdminCredential::new(username, password)?)
}

/// This node's identity
pub fn identity(node: &NodeArgs) -> Result<NodeIdentity> {
    let hostname = node
        .hostname
        .as_deref()
        .filter(|h| !h.trim().is_empty())
        .context("hostname is not set (HOSTNAME or --hostname)")?;
    Ok(NodeIdentity::derive(
        hostname,
        node.fqdn_suffix.as_deref(),
        node.cluster_type,
    )?)
}

/// The group name, defaulting to the instance name without its ordinal
fn group_name(node: &NodeArgs, identity: &NodeIdentity) -> String {
    if let Some(group) = node.group.as_deref().filter(|g| !g.is_empty()) {
        return group.to_string();
    }
    identity
        .hostname()
        .rsplit_once('-')
        .map_or(identity.hostname(), |(prefix, _)| prefix)
        .to_string()
}

fn license(secrets: &SecretArgs) -> Result<Option<License>> {
    let key = resolve_secret(
        secrets.license_key.as_deref(),
        secrets.license_key_file.as_deref(),
    )?;
    match (key, secrets.licensee.as_deref().filter(|l| !l.is_empty())) {
        (Some(key), Some(licensee)) => Ok(Some(License {
            key,
            licensee: licensee.to_string(),
        })),
        (Some(_), None) => bail!("a license key was supplied without a licensee"),
        (None, _) => Ok(None),
    }
}

/// The cluster this node belongs to
pub fn topology(node: &NodeArgs, identity: &NodeIdentity) -> Result<ClusterTopology> {
    let bootstrap_host = node
        .bootstrap_host
        .as_deref()
        .filter(|h| !h.is_empty())
        .context("bootstrap host is not set (FORMATION_BOOTSTRAP_HOST or --bootstrap-host)")?;

    let mut topology = ClusterTopology::new(
        bootstrap_host.trim_end_matches('.'),
        group_name(node, identity),
        node.cluster_type,
    );
    topology.xdqp_ssl_enabled = node.xdqp_ssl;
    topology.join_tls_enabled = node.join_tls;
    topology.realm.clone_from(&node.realm);
    topology.license = license(&node.secrets)?;
    topology.wallet_password = resolve_secret(
        node.secrets.wallet_password.as_deref(),
        node.secrets.wallet_password_file.as_deref(),
    )?;
    Ok(topology)
}

/// Tunables from the optional file, with the certificate mode override applied
pub fn settings(path: Option<&PathBuf>, node: &NodeArgs) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(mode) = node.cert_mode {
        settings.tls.mode = mode;
    }
    Ok(settings)
}

/// Build the full run configuration.
///
/// Credentials are checked first so a misconfigured node fails before
/// touching the network or the filesystem.
pub fn build(config_file: Option<&PathBuf>, node: &NodeArgs) -> Result<FormationConfig> {
    let credential = credential(&node.secrets)?;
    let identity = identity(node)?;
    let topology = topology(node, &identity)?;
    let settings = settings(config_file, node)?;

    let mut config = FormationConfig::new(identity, topology, credential).with_settings(settings);
    config.path_based_routing = node.path_based_routing;
    Ok(config)
}
