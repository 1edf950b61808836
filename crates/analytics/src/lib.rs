//! Analytical queries over the event store.
//!
//! The submodules are pure functions over event slices; `AnalyticsEngine`
//! fetches the matching events, applies deadlines and records metrics.

pub mod aggregate;
pub mod cohort;
pub mod engine;
pub mod funnel;
pub mod predict;

pub use aggregate::*;
pub use cohort::{CohortReport, CohortRequest};
pub use engine::{AnalyticsEngine, EngineConfig, TrackedEvent, DEFAULT_QUERY_TIMEOUT};
pub use funnel::FunnelReport;
pub use predict::PredictiveInsights;
