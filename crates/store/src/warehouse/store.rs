//! `EventStore` implementation over ClickHouse.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};

use insights_core::{AnalyticsEvent, Error, EventFilter, Result};

use super::client::{store_error, ClickHouseClient};
use super::config::ClickHouseConfig;
use super::rows::{EventRow, PayloadRow};
use super::schema::EVENTS_TABLE;
use crate::EventStore;

enum Bind {
    Str(String),
    Millis(i64),
}

/// Translates the indexed parts of a filter into a WHERE clause.
///
/// Segment filters are not pushed down; callers re-check rows with
/// `EventFilter::matches`.
fn where_clause(filter: &EventFilter) -> (String, Vec<Bind>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(ref customer) = filter.customer_id {
        conditions.push("customer_id = ?");
        binds.push(Bind::Str(customer.clone()));
    }
    if let Some(event_type) = filter.event_type {
        conditions.push("event_type = ?");
        binds.push(Bind::Str(event_type.as_str().to_string()));
    }
    if let Some(category) = filter.event_category {
        conditions.push("event_category = ?");
        binds.push(Bind::Str(category.as_str().to_string()));
    }
    if let Some(ref session) = filter.session_id {
        conditions.push("session_id = ?");
        binds.push(Bind::Str(session.clone()));
    }
    if let Some(range) = filter.range {
        conditions.push("timestamp >= fromUnixTimestamp64Milli(?)");
        binds.push(Bind::Millis(range.from.timestamp_millis()));
        conditions.push("timestamp <= fromUnixTimestamp64Milli(?)");
        binds.push(Bind::Millis(range.to.timestamp_millis()));
    }
    if filter.conversions_only {
        conditions.push("conversion_step IS NOT NULL");
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), binds)
    }
}

fn bind_all(mut query: ::clickhouse::query::Query, binds: Vec<Bind>) -> ::clickhouse::query::Query {
    for b in binds {
        query = match b {
            Bind::Str(s) => query.bind(s),
            Bind::Millis(ms) => query.bind(ms),
        };
    }
    query
}

/// Event store persisting to a ClickHouse MergeTree table.
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    /// Builds the client and, if configured, creates the schema.
    pub async fn connect(config: ClickHouseConfig) -> Result<Self> {
        let init = config.init_schema;
        let client = ClickHouseClient::new(config);
        if init {
            client.init_schema().await?;
        }
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    async fn exists(&self, event_id: &str) -> Result<bool> {
        let count: u64 = self
            .client
            .inner()
            .query(&format!("SELECT count() FROM {} WHERE event_id = ?", EVENTS_TABLE))
            .bind(event_id)
            .fetch_one()
            .await
            .map_err(|e| store_error("duplicate check", e))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl EventStore for ClickHouseStore {
    fn backend(&self) -> &'static str {
        "clickhouse"
    }

    async fn append(&self, event: AnalyticsEvent) -> Result<String> {
        if self.exists(&event.event_id).await? {
            return Err(Error::DuplicateEventId(event.event_id));
        }

        let start = Instant::now();
        let row = EventRow::from_event(&event)?;

        // Single-row insert commits atomically on end().
        let mut insert = self
            .client
            .inner()
            .insert(EVENTS_TABLE)
            .map_err(|e| store_error("insert", e))?;
        insert
            .write(&row)
            .await
            .map_err(|e| store_error("insert", e))?;
        insert.end().await.map_err(|e| store_error("insert", e))?;

        debug!(
            event_id = %event.event_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "Inserted event into ClickHouse"
        );
        Ok(event.event_id)
    }

    async fn find(&self, filter: &EventFilter) -> Result<Vec<AnalyticsEvent>> {
        let (clause, binds) = where_clause(filter);
        let sql = format!(
            "SELECT payload FROM {}{} ORDER BY timestamp DESC, event_id DESC",
            EVENTS_TABLE, clause
        );

        let rows: Vec<PayloadRow> = bind_all(self.client.inner().query(&sql), binds)
            .fetch_all()
            .await
            .map_err(|e| store_error("query", e))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            let event = row.decode()?;
            if filter.matches(&event) {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn count_matching(&self, filter: &EventFilter) -> Result<u64> {
        if !filter.segments.is_empty() {
            return Ok(self.find(filter).await?.len() as u64);
        }

        let (clause, binds) = where_clause(filter);
        let sql = format!("SELECT count() FROM {}{}", EVENTS_TABLE, clause);
        bind_all(self.client.inner().query(&sql), binds)
            .fetch_one::<u64>()
            .await
            .map_err(|e| store_error("count", e))
    }

    async fn delete_expired_batch(&self, as_of: DateTime<Utc>, limit: usize) -> Result<u64> {
        let ids: Vec<String> = self
            .client
            .inner()
            .query(&format!(
                "SELECT event_id FROM {} WHERE retention_expiry < fromUnixTimestamp64Milli(?) LIMIT ?",
                EVENTS_TABLE
            ))
            .bind(as_of.timestamp_millis())
            .bind(limit as u64)
            .fetch_all()
            .await
            .map_err(|e| store_error("expired scan", e))?;

        if ids.is_empty() {
            return Ok(0);
        }

        // Lightweight delete: rows vanish from reads atomically per part.
        self.client
            .inner()
            .query(&format!("DELETE FROM {} WHERE has(?, event_id)", EVENTS_TABLE))
            .bind(&ids)
            .execute()
            .await
            .map_err(|e| store_error("delete", e))?;

        info!(deleted = ids.len(), "Deleted expired events from ClickHouse");
        Ok(ids.len() as u64)
    }

    async fn count_all(&self) -> Result<u64> {
        self.client
            .inner()
            .query(&format!("SELECT count() FROM {}", EVENTS_TABLE))
            .fetch_one::<u64>()
            .await
            .map_err(|e| store_error("count", e))
    }

    async fn ping(&self) -> Result<()> {
        self.client.check_connection().await
    }
}
