//! Node-group creation and property maintenance.
//!
//! Runs on the designated (ordinal 0) instance of each node-group. Every
//! mutation is preceded by a read of the current state, so a re-run against
//! a configured cluster changes nothing.

use formation_client::AdminClient;
use formation_core::{xml, GroupDescriptor, Result};
use tracing::{debug, info, warn};

use crate::config::FormationConfig;

/// What happened to the current group's properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyUpdate {
    /// This node's current group could not be read
    Skipped,
    /// The properties already matched
    Unchanged,
    /// Updated in place (204)
    Applied,
    /// Updated, and the group's hosts restart (202)
    RestartTriggered,
    /// The update was refused; logged and ignored
    Rejected(u16),
    /// The bootstrap host could not be reached; logged and ignored
    Unreachable,
}

/// What happened to the target group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCreation {
    /// The cluster-bootstrap group is never created
    NotApplicable,
    /// The group was already present
    Exists,
    /// The group was created (201)
    Created,
    /// Creation was refused; logged and ignored
    Rejected(u16),
    /// The bootstrap host could not be reached; logged and ignored
    Unreachable,
}

/// Outcome of a group configuration pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupReport {
    pub update: PropertyUpdate,
    pub creation: GroupCreation,
}

/// Creates and patches the node-group
pub struct GroupConfigurator<'a> {
    config: &'a FormationConfig,
    client: &'a AdminClient,
}

impl<'a> GroupConfigurator<'a> {
    pub const fn new(config: &'a FormationConfig, client: &'a AdminClient) -> Self {
        Self { config, client }
    }

    fn desired(&self) -> GroupDescriptor {
        GroupDescriptor::new(&self.config.topology.group_name, self.config.topology.xdqp_ssl_enabled)
    }

    pub async fn run(&self) -> Result<GroupReport> {
        let update = self.update_current().await?;
        let creation = if self.config.topology.is_bootstrap_group() {
            GroupCreation::NotApplicable
        } else {
            self.ensure_exists().await?
        };

        Ok(GroupReport { update, creation })
    }

    /// The group this node currently belongs to, per the bootstrap host
    async fn current_group(&self) -> Result<Option<String>> {
        let bootstrap = self.config.bootstrap_host();
        let fqdn = self.config.identity.fqdn();

        let response = match self.client.hosts().properties(bootstrap, fqdn)?.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "host properties unavailable");
                return Ok(None);
            }
        };
        if response.status != 200 {
            debug!(status = response.status, "host is not a cluster member yet");
            return Ok(None);
        }

        Ok(xml::host_group(&response.text())?)
    }

    /// Patch the current group's name and XDQP SSL setting
    async fn update_current(&self) -> Result<PropertyUpdate> {
        let Some(current) = self.current_group().await? else {
            return Ok(PropertyUpdate::Skipped);
        };
        let bootstrap = self.config.bootstrap_host();
        let desired = self.desired();

        match self.client.groups().properties(bootstrap, &current)?.send().await {
            Ok(existing)
                if existing.status == 200
                    && existing.json::<GroupDescriptor>().ok().as_ref() == Some(&desired) =>
            {
                debug!(group = %current, "group properties already up to date");
                return Ok(PropertyUpdate::Unchanged);
            }
            Ok(_) => {}
            Err(e) => debug!(group = %current, error = %e, "group properties unavailable"),
        }

        let response = match self
            .client
            .groups()
            .update_properties(bootstrap, &current, &desired)?
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(group = %current, error = %e, "group property update failed");
                return Ok(PropertyUpdate::Unreachable);
            }
        };

        let update = match response.status {
            204 => PropertyUpdate::Applied,
            202 => PropertyUpdate::RestartTriggered,
            status => {
                warn!(group = %current, status, "group property update refused");
                return Ok(PropertyUpdate::Rejected(status));
            }
        };
        info!(from = %current, to = %desired.name, xdqp_ssl = desired.xdqp_ssl_enabled, ?update, "group properties updated");
        Ok(update)
    }

    /// Create the target group unless it is already present
    async fn ensure_exists(&self) -> Result<GroupCreation> {
        let bootstrap = self.config.bootstrap_host();
        let desired = self.desired();

        match self.client.groups().get(bootstrap, &desired.name)?.send().await {
            Ok(existing) if existing.status == 200 => {
                debug!(group = %desired.name, "group exists");
                return Ok(GroupCreation::Exists);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(group = %desired.name, error = %e, "group lookup failed");
                return Ok(GroupCreation::Unreachable);
            }
        }

        let response = match self.client.groups().create(bootstrap, &desired)?.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(group = %desired.name, error = %e, "group creation failed");
                return Ok(GroupCreation::Unreachable);
            }
        };
        if response.status == 201 {
            info!(group = %desired.name, "group created");
            Ok(GroupCreation::Created)
        } else {
            warn!(group = %desired.name, status = response.status, "group creation refused");
            Ok(GroupCreation::Rejected(response.status))
        }
    }
}
