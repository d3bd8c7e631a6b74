//! Join handshake endpoints.

use crate::config::AdminPort;
use crate::transport::RequestBody;
use crate::{AdminCall, AdminClient};
use formation_core::Result;
use reqwest::Method;

/// Join handshake endpoints
pub struct ClusterApi<'a> {
    client: &'a AdminClient,
}

impl<'a> ClusterApi<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// The joining node's own server configuration document (XML)
    pub fn server_config(&self, host: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::GET, host, AdminPort::Admin, &["admin", "v1", "server-config"], &[])?
            .accept("application/xml");
        Ok(self.client.call(request))
    }

    /// Ask a cluster member for the configuration archive admitting a node
    /// into `group`; 200 with a zip body on success
    pub fn cluster_config_archive(&self, on: &str, group: &str, server_config: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::POST, on, AdminPort::Admin, &["admin", "v1", "cluster-config"], &[])?
            .body(RequestBody::Form(vec![
                ("group".to_string(), group.to_string()),
                ("server-config".to_string(), server_config.to_string()),
            ]))
            .authenticated();
        Ok(self.client.call(request))
    }

    /// Hand the archive to the joining node; 202 as it restarts into the
    /// cluster
    pub fn apply_cluster_config(&self, host: &str, archive: Vec<u8>) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::POST, host, AdminPort::Admin, &["admin", "v1", "cluster-config"], &[])?
            .body(RequestBody::Binary {
                content_type: "application/zip".to_string(),
                data: archive,
            });
        Ok(self.client.call(request))
    }
}
