//! Test fixtures and event generators.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Minimal valid event for a customer.
pub fn event(customer_id: &str, event_type: &str) -> Value {
    json!({
        "customerId": customer_id,
        "eventType": event_type,
        "sessionId": format!("sess_{}", customer_id),
    })
}

/// Event at an explicit time.
pub fn event_at(customer_id: &str, event_type: &str, at: DateTime<Utc>) -> Value {
    let mut e = event(customer_id, event_type);
    e["timestamp"] = json!(rfc3339(at));
    e
}

/// Event tagged as a funnel step.
pub fn step_event(customer_id: &str, step: &str) -> Value {
    let mut e = event(customer_id, step);
    e["properties"] = json!({ "conversionStep": step });
    e
}

/// Revenue-bearing event.
pub fn revenue_event(customer_id: &str, event_type: &str, revenue: f64) -> Value {
    let mut e = event(customer_id, event_type);
    e["properties"] = json!({ "revenue": revenue, "currency": "USD" });
    e
}

/// Event whose retention deadline passed a day ago.
pub fn expired_event(customer_id: &str) -> Value {
    let mut e = event(customer_id, "PAGE_VIEW");
    e["privacy"] = json!({ "dataRetentionExpiry": rfc3339(Utc::now() - Duration::days(1)) });
    e
}

/// Event with device and location detail for segment filters.
pub fn mobile_event(customer_id: &str, event_type: &str, country: &str) -> Value {
    let mut e = event(customer_id, event_type);
    e["device"] = json!({ "platform": "Mobile", "os": "iOS" });
    e["location"] = json!({ "country": country });
    e
}

/// Unique customer id.
pub fn customer() -> String {
    format!("cust_{}", Uuid::new_v4().simple())
}

/// Event body above the per-event size cap.
pub fn oversized_event() -> Value {
    let mut e = event("cust_big", "PAGE_VIEW");
    e["properties"] = json!({ "customData": { "blob": "x".repeat(40_000) } });
    e
}
