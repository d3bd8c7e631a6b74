//! Certificate placement, run before the node starts serving.

use formation_core::{CertificateMode, FormationError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::probe::{encode_chain, fetch_peer_chain};
use super::x509;
use crate::config::{FormationConfig, PROBED_CA_FILE, TRUSTED_CA_FILE};

/// Where the node's TLS material ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Joins do not use TLS
    Disabled,
    /// A mounted certificate was verified and placed
    Named {
        /// Placed certificate
        cert: PathBuf,
        /// Placed private key
        key: PathBuf,
    },
    /// The engine will generate a temporary certificate
    Temporary {
        /// Bootstrap CA chain captured by the probe, if any
        probed_ca: Option<PathBuf>,
    },
}

/// A mounted certificate whose CN matched
struct Candidate {
    cert_path: PathBuf,
    cert_pem: Vec<u8>,
    der: Vec<u8>,
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| FormationError::io(path.display().to_string(), e))
}

async fn write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FormationError::io(parent.display().to_string(), e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| FormationError::io(path.display().to_string(), e))
}

#[cfg(unix)]
async fn restrict(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| FormationError::io(path.display().to_string(), e))
}

#[cfg(not(unix))]
async fn restrict(_path: &Path) -> Result<()> {
    Ok(())
}

/// Selects, verifies and lays out this node's TLS material
pub struct CertificatePlacer<'a> {
    config: &'a FormationConfig,
}

impl<'a> CertificatePlacer<'a> {
    pub const fn new(config: &'a FormationConfig) -> Self {
        Self { config }
    }

    pub async fn place(&self) -> Result<Placement> {
        if !self.config.topology.join_tls_enabled {
            debug!("TLS joins disabled, nothing to place");
            return Ok(Placement::Disabled);
        }

        match self.config.settings.tls.mode {
            CertificateMode::Named => self.place_named().await,
            CertificateMode::SelfSigned => Ok(Placement::Temporary {
                probed_ca: self.probe_bootstrap().await,
            }),
        }
    }

    async fn place_named(&self) -> Result<Placement> {
        let tls = &self.config.settings.tls;
        let fqdn = self.config.identity.fqdn();

        let ca_path = tls.source_dir.join(&tls.ca_file);
        let ca_pem = read(&ca_path).await?;
        let bundle = x509::pem_blocks(&ca_pem, "CERTIFICATE")?;
        if bundle.is_empty() {
            return Err(FormationError::Certificate(format!(
                "{} holds no certificates",
                ca_path.display()
            )));
        }
        write(&tls.trust_dir.join(TRUSTED_CA_FILE), &ca_pem).await?;

        let Some(candidate) = self.find_candidate(&ca_path).await? else {
            if self.config.identity.is_bootstrap_role() {
                return Err(FormationError::NoMatchingCertificate {
                    fqdn: fqdn.to_string(),
                });
            }
            warn!(%fqdn, "no mounted certificate for this node, falling back to a temporary one");
            return Ok(Placement::Temporary { probed_ca: None });
        };

        let key_path = candidate.cert_path.with_extension("key");
        let key_pem = read(&key_path).await?;

        x509::verify_chain(&candidate.der, &bundle)?;
        if !x509::key_matches_certificate(&candidate.der, &key_pem)? {
            return Err(FormationError::Certificate(format!(
                "{} does not match {}",
                key_path.display(),
                candidate.cert_path.display()
            )));
        }

        let cert = tls.placed_cert();
        let key = tls.placed_key();
        write(&cert, &candidate.cert_pem).await?;
        write(&key, &key_pem).await?;
        restrict(&key).await?;

        info!(source = %candidate.cert_path.display(), cert = %cert.display(), "named certificate placed");
        Ok(Placement::Named { cert, key })
    }

    /// The mounted `*.crt` whose subject CN is this node's FQDN
    async fn find_candidate(&self, ca_path: &Path) -> Result<Option<Candidate>> {
        let dir = &self.config.settings.tls.source_dir;
        let fqdn = self.config.identity.fqdn();

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| FormationError::io(dir.display().to_string(), e))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FormationError::io(dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("crt") && path != ca_path {
                paths.push(path);
            }
        }
        paths.sort();

        for cert_path in paths {
            let cert_pem = read(&cert_path).await?;
            let der = match x509::first_certificate(&cert_pem) {
                Ok(der) => der,
                Err(e) => {
                    debug!(path = %cert_path.display(), error = %e, "skipping unreadable certificate");
                    continue;
                }
            };
            let cn = match x509::common_name(&der) {
                Ok(cn) => cn,
                Err(e) => {
                    debug!(path = %cert_path.display(), error = %e, "skipping malformed certificate");
                    continue;
                }
            };
            debug!(path = %cert_path.display(), cn = ?cn, "candidate certificate");
            if cn.as_deref() == Some(fqdn) {
                return Ok(Some(Candidate {
                    cert_path,
                    cert_pem,
                    der,
                }));
            }
        }
        Ok(None)
    }

    /// Capture the bootstrap host's chain as a trust anchor. Best-effort.
    async fn probe_bootstrap(&self) -> Option<PathBuf> {
        if self.config.establishes_cluster() {
            return None;
        }

        let settings = &self.config.settings;
        let host = self.config.bootstrap_host();
        let timeout = Duration::from_secs(settings.tls.probe_timeout_secs);

        let chain = match fetch_peer_chain(host, settings.ports.admin, timeout).await {
            Ok(chain) => chain,
            Err(e) => {
                warn!(%host, error = %e, "could not capture bootstrap CA chain");
                return None;
            }
        };

        let path = settings.tls.trust_dir.join(PROBED_CA_FILE);
        match write(&path, encode_chain(&chain).as_bytes()).await {
            Ok(()) => {
                info!(%host, path = %path.display(), certificates = chain.len(), "bootstrap CA chain stored");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "could not store bootstrap CA chain");
                None
            }
        }
    }
}
