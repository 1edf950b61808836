//! Validation and enrichment of incoming events.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::enrichment::enrich_device;
use crate::error::{Error, Result};
use crate::events::{AnalyticsEvent, DataQuality, EventInput, EventType, Privacy};
use crate::limits::MAX_EVENT_SIZE_BYTES;
use crate::retention::RetentionPolicy;

/// Validates a single serialized event size.
///
/// Use this to reject oversized events before deserialization.
pub fn validate_event_size(raw_bytes: &[u8]) -> Result<()> {
    if raw_bytes.len() > MAX_EVENT_SIZE_BYTES {
        return Err(Error::validation(format!(
            "event {}KB exceeds {}KB limit",
            raw_bytes.len() / 1024,
            MAX_EVENT_SIZE_BYTES / 1024
        )));
    }
    Ok(())
}

/// Generates a fresh event id.
pub fn generate_event_id() -> String {
    format!("evt_{}", Uuid::new_v4().simple())
}

/// Validates raw input and produces a storable event with the default
/// one-year retention.
pub fn validate_and_enrich(input: EventInput, now: DateTime<Utc>) -> Result<AnalyticsEvent> {
    validate_and_enrich_with(input, now, &RetentionPolicy::default())
}

/// Validates raw input and produces a storable event.
pub fn validate_and_enrich_with(
    input: EventInput,
    now: DateTime<Utc>,
    policy: &RetentionPolicy,
) -> Result<AnalyticsEvent> {
    let customer_id = input
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::missing_field("customerId"))?
        .to_string();

    let event_type = input
        .event_type
        .as_deref()
        .and_then(EventType::parse)
        .ok_or_else(|| Error::missing_field("eventType"))?;

    input
        .validate()
        .map_err(|e| Error::validation(format!("{}", e)))?;

    if let Some(ref location) = input.location {
        location
            .validate()
            .map_err(|e| Error::validation(format!("location: {}", e)))?;
        if let Some(ref coords) = location.coordinates {
            coords
                .validate()
                .map_err(|e| Error::validation(format!("location.coordinates: {}", e)))?;
        }
    }
    if let Some(ref device) = input.device {
        device
            .validate()
            .map_err(|e| Error::validation(format!("device: {}", e)))?;
    }
    input
        .properties
        .validate()
        .map_err(|e| Error::validation(format!("properties: {}", e)))?;
    input
        .metrics
        .validate()
        .map_err(|e| Error::validation(format!("metrics: {}", e)))?;
    for (i, experiment) in input.experiments.iter().enumerate() {
        experiment
            .validate()
            .map_err(|e| Error::validation(format!("experiments[{}]: {}", i, e)))?;
    }
    if let Some(ref privacy) = input.privacy {
        privacy
            .validate()
            .map_err(|e| Error::validation(format!("privacy: {}", e)))?;
    }

    let mut device = input.device;
    if let Some(ref mut d) = device {
        enrich_device(d);
    }

    let privacy_input = input.privacy.unwrap_or_default();
    let privacy = Privacy {
        consent_given: privacy_input.consent_given.unwrap_or(false),
        data_retention_expiry: privacy_input
            .data_retention_expiry
            .unwrap_or_else(|| policy.expiry_for(now)),
        anonymized: privacy_input.anonymized.unwrap_or(false),
        ip_address_hashed: privacy_input.ip_address_hashed,
    };

    Ok(AnalyticsEvent {
        event_id: input.event_id.unwrap_or_else(generate_event_id),
        customer_id,
        customer_type: input.customer_type.unwrap_or_default(),
        event_type,
        event_category: input
            .event_category
            .unwrap_or_else(|| event_type.default_category()),
        session_id: input.session_id,
        timestamp: input.timestamp.unwrap_or(now),
        location: input.location,
        device,
        properties: input.properties,
        metrics: input.metrics,
        experiments: input.experiments,
        data_quality: DataQuality {
            is_valid: true,
            validation_errors: Vec::new(),
            processing_time: now,
            data_source: input.data_source.unwrap_or_default(),
        },
        privacy,
        created_at: now,
    })
}
