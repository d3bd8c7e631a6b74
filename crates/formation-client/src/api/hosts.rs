//! Host endpoints.

use crate::config::AdminPort;
use crate::{AdminCall, AdminClient};
use formation_core::Result;
use reqwest::Method;

/// Host endpoints
pub struct HostsApi<'a> {
    client: &'a AdminClient,
}

impl<'a> HostsApi<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Properties of `host` as known by the cluster that `on` belongs to.
    ///
    /// 200 means `host` is a member; 404 means it is not.
    pub fn properties(&self, on: &str, host: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(
                Method::GET,
                on,
                AdminPort::Manage,
                &["manage", "v2", "hosts", host, "properties"],
                &[("format", "xml")],
            )?
            .authenticated()
            .accept("application/xml");
        Ok(self.client.call(request))
    }

    /// The node's last-startup timestamp; also its liveness signal
    pub fn timestamp(&self, host: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::GET, host, AdminPort::Admin, &["admin", "v1", "timestamp"], &[])?
            .authenticated();
        Ok(self.client.call(request))
    }

    /// Bare plain-HTTP request to the admin listener, used to observe the
    /// auth challenge a running, secured node answers with
    pub fn challenge_probe(&self, host: &str) -> Result<AdminCall<'a>> {
        let url = self.client.url_with_scheme(
            "http",
            host,
            AdminPort::Admin,
            &["admin", "v1", "timestamp"],
            &[],
        )?;
        Ok(self.client.call(crate::AdminRequest::new(Method::GET, url)))
    }
}
