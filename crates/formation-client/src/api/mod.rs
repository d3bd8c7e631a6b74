//! API endpoint modules.

mod cluster;
mod eval;
mod groups;
mod hosts;
mod instance;
mod servers;
mod templates;

pub use cluster::ClusterApi;
pub use eval::EvalApi;
pub use groups::GroupsApi;
pub use hosts::HostsApi;
pub use instance::{InstanceAdmin, InstanceApi};
pub use servers::{ServerProperties, ServersApi};
pub use templates::{CertificateTemplate, TemplatesApi};
