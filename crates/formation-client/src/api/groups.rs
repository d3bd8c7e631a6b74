//! Group endpoints.

use crate::config::AdminPort;
use crate::transport::RequestBody;
use crate::{AdminCall, AdminClient};
use formation_core::{GroupDescriptor, Result};
use reqwest::Method;

/// Group endpoints
pub struct GroupsApi<'a> {
    client: &'a AdminClient,
}

impl<'a> GroupsApi<'a> {
    pub(crate) fn new(client: &'a AdminClient) -> Self {
        Self { client }
    }

    /// Fetch a group by name; 200 if it exists
    pub fn get(&self, on: &str, group: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::GET, on, AdminPort::Manage, &["manage", "v2", "groups", group], &[])?
            .authenticated();
        Ok(self.client.call(request))
    }

    /// Read a group's properties as JSON
    pub fn properties(&self, on: &str, group: &str) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(
                Method::GET,
                on,
                AdminPort::Manage,
                &["manage", "v2", "groups", group, "properties"],
                &[("format", "json")],
            )?
            .authenticated()
            .accept("application/json");
        Ok(self.client.call(request))
    }

    /// Update a group's name and XDQP setting.
    ///
    /// 204 when applied, 202 when applied and a restart was triggered.
    pub fn update_properties(&self, on: &str, group: &str, desired: &GroupDescriptor) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(
                Method::PUT,
                on,
                AdminPort::Manage,
                &["manage", "v2", "groups", group, "properties"],
                &[],
            )?
            .body(RequestBody::Json(serde_json::to_value(desired)?))
            .authenticated();
        Ok(self.client.call(request))
    }

    /// Create a group; 201 when created
    pub fn create(&self, on: &str, group: &GroupDescriptor) -> Result<AdminCall<'a>> {
        let request = self
            .client
            .request(Method::POST, on, AdminPort::Manage, &["manage", "v2", "groups"], &[])?
            .body(RequestBody::Json(serde_json::to_value(group)?))
            .authenticated();
        Ok(self.client.call(request))
    }
}
