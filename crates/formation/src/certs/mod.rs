//! TLS material for the node.
//!
//! Provisioning happens in two phases:
//!
//! - **placement** runs before the node serves: it picks the mounted
//!   certificate whose CN is this node's FQDN, verifies it and lays it out
//!   for the server, or (self-signed mode) captures the bootstrap host's CA
//!   chain with an unverified TLS probe
//! - **activation** runs once the node is a cluster member: it registers
//!   the certificate with the certificate template (or has the engine
//!   generate a temporary one) and secures the admin servers

mod activation;
mod placement;
mod probe;
pub mod x509;

pub use activation::{Activation, CertificateActivator};
pub use placement::{CertificatePlacer, Placement};
pub use probe::fetch_peer_chain;
