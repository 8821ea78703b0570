//! Mode management and mode-derived policy.

mod manager;
mod rules;

pub use manager::ModeManager;
pub use rules::ModeBehavior;
