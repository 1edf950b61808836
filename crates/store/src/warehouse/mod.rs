//! ClickHouse-backed event store.

pub mod client;
pub mod config;
pub mod rows;
pub mod schema;
pub mod store;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use store::ClickHouseStore;
