//! Domain types for cluster formation.

mod certificate;
mod credential;
mod epoch;
mod group;
mod identity;
mod topology;

pub use certificate::*;
pub use credential::*;
pub use epoch::*;
pub use group::*;
pub use identity::*;
pub use topology::*;
