//! ClickHouse table schema.
//!
//! Filter columns are stored flat for indexed access; the full record
//! is kept as JSON in `payload` and decoded on read.

/// Events table name.
pub const EVENTS_TABLE: &str = "analytics_events";

/// `CREATE DATABASE` for `database`.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// `CREATE TABLE` for the events table.
///
/// Sorted by `(customer_id, timestamp, event_id)` for per-customer range
/// scans. Type, category and session lookups go through skip indexes;
/// the minmax index on `retention_expiry` keeps purges cheap.
pub fn create_events_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{EVENTS_TABLE} (
    event_id String,
    customer_id String,
    customer_type LowCardinality(String),
    event_type LowCardinality(String),
    event_category LowCardinality(String),
    session_id Nullable(String),
    timestamp DateTime64(3),
    conversion_step Nullable(String),
    retention_expiry DateTime64(3),
    payload String,
    created_at DateTime64(3),

    INDEX idx_event_type event_type TYPE set(32) GRANULARITY 4,
    INDEX idx_event_category event_category TYPE set(8) GRANULARITY 4,
    INDEX idx_session_id session_id TYPE bloom_filter(0.01) GRANULARITY 4,
    INDEX idx_event_id event_id TYPE bloom_filter(0.01) GRANULARITY 4,
    INDEX idx_retention_expiry retention_expiry TYPE minmax GRANULARITY 4
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (customer_id, timestamp, event_id)
SETTINGS index_granularity = 8192
"#
    )
}

/// All schema statements, in execution order.
pub fn all_statements(database: &str) -> Vec<String> {
    vec![create_database(database), create_events_table(database)]
}
