//! Telemetry for the insights engine.
//!
//! Metrics and health live in process-wide registries that the api
//! crate reads back for the health endpoints.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
