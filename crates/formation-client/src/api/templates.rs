//! Certificate template endpoints.

use crate::config::AdminPort;
use crate::transport::{AdminRequest, RequestBody};
use crate::{AdminCall, AdminClient};
use formation_core::Result;
use reqwest::Method;
use serde::Serialize;
use serde_json::json;

/// A certificate template definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateTemplate {
    /// Template name
    #[serde(rename = "template-name")]
    pub name: String,

    /// Free-text description
    #[serde(rename = "template-description")]
    pub description: String,

    /// Key algorithm
    #[serde(rename = "key-type")]
    pub key_type: String,

    /// Key generation options
    #[serde(rename = "key-options")]
    pub key_options: serde_json::Value,

    /// Certificate request defaults
    pub req: serde_json::Value,
}

impl CertificateTemplate {
    /// RSA-2048 template with the given name
    pub fn rsa(name: impl Into<String>, organization: &str) -> Self {
        Self {
            name: name.into(),
            description: "Cluster TLS certificate template".to_string(),
            key_type: "rsa".to_string(),
            key_options: json!({ "key-length": "2048" }),
            req: json!({
                "version": "0",
                "subject": { "organizationName": organization }
            }),
        }
    }
}

/// Certificate template endpoints
pub struct TemplatesApi<'a> {
    client: &'a AdminClient,
}

impl<'a> TemplatesApi<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Fetch a template by name; 200 if it exists
    pub fn get(&self, on: &str, template: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(
                Method::GET,
                on,
                AdminPort::Manage,
                &["manage", "v2", "certificate-templates", template],
                &[],
            )?
            .authenticated();
        Ok(self.client.call(request))
    }

    /// Create a template; 201 when created
    pub fn create(&self, on: &str, template: &CertificateTemplate) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(
                Method::POST,
                on,
                AdminPort::Manage,
                &["manage", "v2", "certificate-templates"],
                &[],
            )?
            .body(RequestBody::Json(serde_json::to_value(template)?))
            .authenticated();
        Ok(self.client.call(request))
    }

    /// List the certificates issued under a template (XML reply)
    pub fn certificates(&self, on: &str, template: &str) -> Result<AdminCall<'a>> {
        let request = self
            .operation(on, template, json!({ "operation": "get-certificates-for-template" }))?
            .accept("application/xml");
        Ok(self.client.call(request))
    }

    /// Install an operator-supplied certificate and key for a host
    pub fn insert_host_certificate(&self, on: &str, template: &str, cert_pem: &str, key_pem: &str) -> Result<AdminCall<'a>> {
        let request = self.operation(
            on,
            template,
            json!({
                "operation": "insert-host-certificates",
                "certificates": [
                    { "certificate": { "cert": cert_pem, "pkey": key_pem } }
                ]
            }),
        )?;
        Ok(self.client.call(request))
    }

    fn operation(&self, on: &str, template: &str, body: serde_json::Value) -> Result<AdminRequest> {
        let request = self
            .client
            .request(
                Method::POST,
                on,
                AdminPort::Manage,
                &["manage", "v2", "certificate-templates", template],
                &[],
            )?
            .body(RequestBody::Json(body))
            .authenticated();
        Ok(request)
    }
}
