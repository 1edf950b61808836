//! Core types, validation, and query parameters for the customer insights engine.

pub mod enrichment;
pub mod error;
pub mod events;
pub mod filter;
pub mod limits;
pub mod query;
pub mod retention;
pub mod schema;

pub use error::{Error, Result};
pub use events::*;
pub use filter::*;
pub use query::*;
pub use retention::*;
pub use schema::{generate_event_id, validate_and_enrich, validate_and_enrich_with, validate_event_size};
