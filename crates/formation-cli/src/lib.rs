//! # formation-cli
//!
//! Command-line entry point for cluster formation.
//!
//! - `formation bootstrap` runs the full protocol for this node
//! - `formation place-certs` selects and verifies TLS material before the
//!   node starts serving
//! - `formation identity` prints what the node derives about itself
//!
//! Every input can come from a flag or its environment variable; secrets
//! can also be read from mounted files via the `*_FILE` variants.

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::run;
