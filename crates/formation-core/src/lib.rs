//! Core types for the cluster formation protocol.
//!
//! This crate provides the foundational types shared by the admin client and
//! the protocol components:
//!
//! - **Types**: node identity, cluster topology, credentials, restart epochs,
//!   group descriptors and certificate material
//! - **Errors**: a single [`FormationError`] with a [`Result`] alias
//! - **Parsing**: typed readers for the admin API's XML replies
//!
//! # Example
//!
//! ```rust
//! use formation_core::{ClusterType, NodeIdentity};
//!
//! let node = NodeIdentity::derive("dnode-0", Some("dnode.db.svc.cluster.local"), ClusterType::Bootstrap)?;
//! assert_eq!(node.ordinal(), 0);
//! assert!(node.is_bootstrap_role());
//! # Ok::<(), formation_core::FormationError>(())
//! ```

mod error;
pub mod types;
pub mod xml;

pub use error::{FormationError, Result};
pub use types::*;
