//! Certificate activation, run once the node is a cluster member.

use formation_client::api::CertificateTemplate;
use formation_client::{AdminClient, AdminResponse, RetryConfig};
use formation_core::{xml, CertificateMaterial, CertificateMode, FormationError, Result, TemplateCertificate};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{FormationConfig, TRUSTED_CA_FILE};
use crate::servers::ServerSwitcher;

/// What activation did for this host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The placed named certificate was installed
    Installed,
    /// The engine generated a temporary certificate
    Generated,
    /// The host already held a suitable certificate
    AlreadyPresent,
}

/// Quote `value` as an XQuery string literal
fn xquery_string(value: &str) -> String {
    format!("\"{}\"", value.replace('&', "&amp;").replace('"', "\"\""))
}

fn pki_module(body: &str) -> String {
    format!(
        "xquery version \"1.0-ml\";\n\
         import module namespace pki = \"http://marklogic.com/xdmp/pki\" at \"/MarkLogic/pki.xqy\";\n\
         {body}"
    )
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FormationError::io(path.display().to_string(), e)),
    }
}

/// Registers this node's certificate with the template and secures the
/// admin servers
pub struct CertificateActivator<'a> {
    config: &'a FormationConfig,
    client: &'a AdminClient,
}

impl<'a> CertificateActivator<'a> {
    pub const fn new(config: &'a FormationConfig, client: &'a AdminClient) -> Self {
        Self { config, client }
    }

    fn template(&self) -> &str {
        &self.config.settings.tls.template_name
    }

    pub async fn run(&self) -> Result<Activation> {
        if self.config.identity.is_bootstrap_role() {
            self.ensure_template().await?;
        }

        let material = self.placed_material().await?;
        let certificates = self.certificates().await?;
        let held = TemplateCertificate::for_host(&certificates, self.config.identity.fqdn());

        let activation = match (&material, held) {
            (Some(_), Some(cert)) if !cert.temporary => Activation::AlreadyPresent,
            (Some(material), _) => self.install(material).await?,
            (None, Some(_)) => Activation::AlreadyPresent,
            (None, None) => self.generate_temporary().await?,
        };
        info!(?activation, template = %self.template(), "host certificate active");

        if self.config.identity.is_designated() {
            ServerSwitcher::new(self.config, self.client)
                .use_certificate_template()
                .await?;
        }

        self.remove_placed_key().await?;
        Ok(activation)
    }

    /// Create the certificate template if absent. Best-effort, except for
    /// CA generation on a template this node just created.
    async fn ensure_template(&self) -> Result<()> {
        let bootstrap = self.config.bootstrap_host();
        let tls = &self.config.settings.tls;

        match self.client.templates().get(bootstrap, self.template())?.send().await {
            Ok(existing) if existing.status == 200 => {
                debug!(template = %self.template(), "certificate template exists");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "certificate template lookup failed"),
        }

        let definition = CertificateTemplate::rsa(self.template(), &tls.organization);
        match self.client.templates().create(bootstrap, &definition)?.send().await {
            Ok(response) if response.status == 201 => {
                info!(template = %self.template(), "certificate template created");
            }
            Ok(response) => {
                warn!(template = %self.template(), status = response.status, "certificate template creation refused");
                return Ok(());
            }
            Err(e) => {
                warn!(template = %self.template(), error = %e, "certificate template creation failed");
                return Ok(());
            }
        }

        if tls.mode == CertificateMode::SelfSigned && self.config.establishes_cluster() {
            let module = pki_module(&format!(
                "pki:generate-template-certificate-authority(\
                 pki:template-get-id(pki:get-template-by-name({})), {})",
                xquery_string(self.template()),
                tls.validity_days
            ));
            self.client
                .eval()
                .xquery(self.config.local_host(), &module)?
                .retry_until(200, &self.retry())
                .await
                .into_response("generate template CA", 200)?;
            info!(template = %self.template(), "template certificate authority generated");
        }
        Ok(())
    }

    fn retry(&self) -> RetryConfig {
        self.config.settings.retry.into()
    }

    /// Certificates issued under the template, waiting for the template to
    /// appear
    async fn certificates(&self) -> Result<Vec<TemplateCertificate>> {
        let response = self
            .client
            .templates()
            .certificates(self.config.bootstrap_host(), self.template())?
            .retry_until(200, &self.retry())
            .await
            .into_response(&format!("list certificates of {}", self.template()), 200)?;
        xml::template_certificates(&response.text())
    }

    /// The named certificate left by placement, if any
    async fn placed_material(&self) -> Result<Option<CertificateMaterial>> {
        let tls = &self.config.settings.tls;
        let cert = read_optional(&tls.placed_cert()).await?;
        let key = read_optional(&tls.placed_key()).await?;
        let ca = read_optional(&tls.trust_dir.join(TRUSTED_CA_FILE)).await?;

        Ok(cert.zip(key).map(|(cert, key)| CertificateMaterial {
            mode: CertificateMode::Named,
            cert,
            key,
            ca,
        }))
    }

    async fn install(&self, material: &CertificateMaterial) -> Result<Activation> {
        self.client
            .templates()
            .insert_host_certificate(self.config.bootstrap_host(), self.template(), &material.cert, &material.key)?
            .retry_matching(&self.retry(), AdminResponse::is_success)
            .await
            .into_response("install named certificate", 201)?;
        Ok(Activation::Installed)
    }

    async fn generate_temporary(&self) -> Result<Activation> {
        let fqdn = xquery_string(self.config.identity.fqdn());
        let module = pki_module(&format!(
            "pki:generate-temporary-certificate-if-necessary(\
             pki:template-get-id(pki:get-template-by-name({})), {}, {fqdn}, {fqdn}, ())",
            xquery_string(self.template()),
            self.config.settings.tls.validity_days
        ));

        self.client
            .eval()
            .xquery(self.config.local_host(), &module)?
            .retry_until(200, &self.retry())
            .await
            .into_response("generate temporary certificate", 200)?;
        Ok(Activation::Generated)
    }

    async fn remove_placed_key(&self) -> Result<()> {
        let key = self.config.settings.tls.placed_key();
        match tokio::fs::remove_file(&key).await {
            Ok(()) => {
                info!(path = %key.display(), "placed private key removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FormationError::io(key.display().to_string(), e)),
        }
    }
}
