//! Instance initialization endpoints.
//!
//! These run before the node has a security database, so they are sent
//! without credentials.

use crate::config::AdminPort;
use crate::transport::RequestBody;
use crate::{AdminCall, AdminClient};
use formation_core::{AdminCredential, ClusterTopology, License, Result};
use reqwest::Method;
use serde::Serialize;

/// One-time security initialization payload
#[derive(Serialize)]
pub struct InstanceAdmin<'a> {
    /// Admin username
    #[serde(rename = "admin-username")]
    pub username: &'a str,

    /// Admin password
    #[serde(rename = "admin-password")]
    pub password: &'a str,

    /// Security realm
    pub realm: &'a str,

    /// Wallet password, if one is configured
    #[serde(rename = "wallet-password", skip_serializing_if = "Option::is_none")]
    pub wallet_password: Option<&'a str>,
}

impl<'a> InstanceAdmin<'a> {
    /// Payload for the given credential and topology
    #[must_use]
    pub fn new(credential: &'a AdminCredential, topology: &'a ClusterTopology) -> Self {
        Self {
            username: credential.username(),
            password: credential.password(),
            realm: &topology.realm,
            wallet_password: topology.wallet_password.as_deref(),
        }
    }
}

/// Instance initialization endpoints
pub struct InstanceApi<'a> {
    client: &'a AdminClient,
}

impl<'a> InstanceApi<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Initialize the instance, applying a license if given.
    ///
    /// 202 means a restart was triggered.
    pub fn init(&self, host: &str, license: Option<&License>) -> Result<AdminCall<'a>> {
        let body = match license {
            Some(license) => serde_json::to_value(license)?,
            None => serde_json::json!({}),
        };
        let request = self
            .client
            .request(Method::POST, host, AdminPort::Admin, &["admin", "v1", "init"], &[])?
            .body(RequestBody::Json(body));
        Ok(self.client.call(request))
    }

    /// Install the security database and admin user.
    ///
    /// 202 means a restart was triggered.
    pub fn instance_admin(&self, host: &str, payload: &InstanceAdmin<'_>) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::POST, host, AdminPort::Admin, &["admin", "v1", "instance-admin"], &[])?
            .body(RequestBody::Json(serde_json::to_value(payload)?));
        Ok(self.client.call(request))
    }
}
