//! Capability registry and taxonomy.
//!
//! A capability is a named unit of executable behavior the router can
//! reach. Names are dotted; the first segment decides the family used for
//! reporting and for mode gating.

mod error;
mod registry;
mod taxonomy;

pub use error::CapabilityError;
pub use registry::{Capability, CapabilityHandler, CapabilityInfo, CapabilityRegistry};
pub use taxonomy::CapabilityCategory;
