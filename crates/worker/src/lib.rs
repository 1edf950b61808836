//! Background workers for the insights engine.
//!
//! - Retention (compliance purge of expired events)
//! - Store health probe (readiness and record count)

pub mod retention;
pub mod scheduler;

pub use retention::{PurgeReport, RetentionManager};
pub use scheduler::*;
