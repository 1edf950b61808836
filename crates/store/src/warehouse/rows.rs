//! Row types exchanged with ClickHouse.

use ::clickhouse::Row;
use insights_core::{AnalyticsEvent, Result};
use serde::{Deserialize, Serialize};

/// Flattened event row for insertion. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Row, Serialize)]
pub struct EventRow {
    pub event_id: String,
    pub customer_id: String,
    pub customer_type: String,
    pub event_type: String,
    pub event_category: String,
    pub session_id: Option<String>,
    pub timestamp: i64,
    pub conversion_step: Option<String>,
    pub retention_expiry: i64,
    pub payload: String,
    pub created_at: i64,
}

impl EventRow {
    pub fn from_event(event: &AnalyticsEvent) -> Result<Self> {
        Ok(Self {
            event_id: event.event_id.clone(),
            customer_id: event.customer_id.clone(),
            customer_type: event.customer_type.as_str().to_string(),
            event_type: event.event_type.as_str().to_string(),
            event_category: event.event_category.as_str().to_string(),
            session_id: event.session_id.clone(),
            timestamp: event.timestamp.timestamp_millis(),
            conversion_step: event.properties.conversion_step.clone(),
            retention_expiry: event.privacy.data_retention_expiry.timestamp_millis(),
            payload: serde_json::to_string(event)?,
            created_at: event.created_at.timestamp_millis(),
        })
    }
}

/// Stored JSON record read back from the table.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct PayloadRow {
    pub payload: String,
}

impl PayloadRow {
    pub fn decode(&self) -> Result<AnalyticsEvent> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}
