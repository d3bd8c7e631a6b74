//! Admin HTTP client for the cluster formation protocol.
//!
//! This crate provides [`AdminClient`], which speaks to a database node's
//! administrative HTTP interface. Every call goes through an
//! [`AdminTransport`]; the production transport is built on `reqwest`.
//!
//! Calls are built through per-resource accessors and then either sent once
//! or retried until a status (or predicate) matches:
//!
//! ```rust,ignore
//! let client = AdminClient::builder(credential).build()?;
//! let outcome = client
//!     .groups()
//!     .get("dnode-0.dnode.local", "enode")?
//!     .retry_until(200, &RetryConfig::new().attempts(10))
//!     .await;
//! ```

#![doc(html_root_url = "https://docs.rs/formation-client/0.3.0")]

mod auth;
mod client;
mod config;
mod retry;
mod transport;
pub mod api;

pub use client::{AdminCall, AdminClient, AdminClientBuilder};
pub use config::*;
pub use formation_core::{FormationError, Result};
pub use reqwest::Method;
pub use retry::RetryOutcome;
pub use transport::{AdminRequest, AdminResponse, AdminTransport, Authorization, ReqwestTransport, RequestBody};
