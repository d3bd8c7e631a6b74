//! Admin app-server property switches.

use formation_client::api::ServerProperties;
use formation_client::AdminClient;
use formation_core::{FormationError, Result};
use tracing::{info, warn};

use crate::config::FormationConfig;

/// Admin servers reconfigured by the switches, in switch order. The
/// management server comes last so the calls making the switch keep working
/// until the end.
pub const SECURED_SERVERS: [&str; 3] = ["App-Services", "Admin", "Manage"];

/// Moves the admin servers onto an auth scheme or certificate template
pub struct ServerSwitcher<'a> {
    config: &'a FormationConfig,
    client: &'a AdminClient,
}

impl<'a> ServerSwitcher<'a> {
    pub const fn new(config: &'a FormationConfig, client: &'a AdminClient) -> Self {
        Self { config, client }
    }

    /// Switch the admin servers to basic auth. Best-effort.
    pub async fn use_basic_auth(&self) -> Result<usize> {
        let properties = ServerProperties::authentication("basic");
        let mut switched = 0;

        for server in SECURED_SERVERS {
            match self.put(server, &properties).await {
                Ok(status) if (200..300).contains(&status) => switched += 1,
                Ok(status) => warn!(server, status, "auth scheme switch refused"),
                Err(e) => warn!(server, error = %e, "auth scheme switch failed"),
            }
        }

        info!(switched, "admin servers use basic auth");
        Ok(switched)
    }

    /// Secure the admin servers with the certificate template. Any refusal
    /// is fatal.
    pub async fn use_certificate_template(&self) -> Result<()> {
        let template = &self.config.settings.tls.template_name;
        let properties = ServerProperties::certificate_template(template.clone());

        for server in SECURED_SERVERS {
            let status = self.put(server, &properties).await?;
            if !matches!(status, 200 | 202 | 204) {
                return Err(FormationError::unexpected(
                    format!("secure {server} with {template}"),
                    "200, 202 or 204",
                    status,
                ));
            }
            info!(server, %template, "server secured");
        }
        Ok(())
    }

    async fn put(&self, server: &str, properties: &ServerProperties) -> Result<u16> {
        let response = self
            .client
            .servers()
            .update_properties(
                self.config.bootstrap_host(),
                server,
                &self.config.topology.group_name,
                properties,
            )?
            .send()
            .await?;
        Ok(response.status)
    }
}
