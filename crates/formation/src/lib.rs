//! Self-forming database cluster bootstrap.
//!
//! Each node of a clustered database runs this protocol once, as a
//! lifecycle hook, after its local process is alive. With nothing but the
//! admin HTTP API, retries and restart tokens, the node:
//!
//! 1. waits for its own server to answer
//! 2. either initializes cluster security (the bootstrap node) or waits for
//!    the bootstrap host and joins it
//! 3. makes sure its node-group exists with the right properties
//! 4. optionally provisions and activates TLS material
//!
//! Every step checks authoritative server state before mutating it, so
//! re-running the whole sequence after a crash is always safe.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use formation::{Coordinator, FormationConfig};
//!
//! let config = FormationConfig::new(identity, topology, credential);
//! let client = config.admin_client()?;
//! let report = Coordinator::new(&config, &client).run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/formation/0.3.0")]

pub mod certs;
mod config;
mod coordinator;
mod group;
mod join;
mod readiness;
mod restart;
mod security;
mod servers;

#[cfg(test)]
mod testing;

pub use config::{
    FormationConfig, JoinConfirmation, JoinSettings, ReadinessSettings, RetrySettings, Settings, TlsSettings,
    PROBED_CA_FILE, TRUSTED_CA_FILE,
};
pub use coordinator::{Coordinator, CoordinatorReport, EntryPath, Phase};
pub use group::{GroupConfigurator, GroupCreation, GroupReport, PropertyUpdate};
pub use join::{JoinOrchestrator, JoinState};
pub use readiness::ReadinessProber;
pub use restart::RestartDetector;
pub use security::{SecurityBootstrapper, SecurityState};
pub use servers::{ServerSwitcher, SECURED_SERVERS};

// Re-export core types and the client
pub use formation_client::{self as client, AdminClient, RetryConfig};
pub use formation_core::*;
