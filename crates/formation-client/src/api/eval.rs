//! Server-side evaluation endpoint.

use crate::config::AdminPort;
use crate::transport::RequestBody;
use crate::{AdminCall, AdminClient};
use formation_core::Result;
use reqwest::Method;

/// Server-side evaluation endpoint
pub struct EvalApi<'a> {
    client: &'a AdminClient,
}

impl<'a> EvalApi<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Evaluate an XQuery main module on `on`; 200 on success
    pub fn xquery(&self, on: &str, module: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::POST, on, AdminPort::App, &["v1", "eval"], &[])?
            .body(RequestBody::Form(vec![("xquery".to_string(), module.to_string())]))
            .authenticated();
        Ok(self.client.call(request))
    }
}
