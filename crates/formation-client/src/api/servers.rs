//! App server endpoints.

use crate::config::AdminPort;
use crate::transport::RequestBody;
use crate::{AdminCall, AdminClient};
use formation_core::Result;
use reqwest::Method;
use serde::Serialize;

/// Subset of app server properties this client changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerProperties {
    /// Authentication scheme (`basic`, `digest`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,

    /// Certificate template securing the server
    #[serde(rename = "ssl-certificate-template", skip_serializing_if = "Option::is_none")]
    pub ssl_certificate_template: Option<String>,
}

impl ServerProperties {
    /// Switch the authentication scheme
    pub fn authentication(scheme: impl Into<String>) -> Self {
        Self {
            authentication: Some(scheme.into()),
            ..Self::default()
        }
    }

    /// Secure the server with a certificate template
    pub fn certificate_template(template: impl Into<String>) -> Self {
        Self {
            ssl_certificate_template: Some(template.into()),
            ..Self::default()
        }
    }
}

/// App server endpoints
pub struct ServersApi<'a> {
    client: &'a AdminClient,
}

impl<'a> ServersApi<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Update a server's properties within a group.
    ///
    /// 204 when applied, 202 when applied and a restart was triggered.
    pub fn update_properties(
        &self,
        on: &str,
        server: &str,
        group: &str,
        properties: &ServerProperties,
    ) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(
                Method::PUT,
                on,
                AdminPort::Manage,
                &["manage", "v2", "servers", server, "properties"],
                &[("group-id", group)],
            )?
            .body(RequestBody::Json(serde_json::to_value(properties)?))
            .authenticated();
        Ok(self.client.call(request))
    }
}
