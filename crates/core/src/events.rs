//! Analytics event definitions.
//!
//! `EventInput` is the loosely-populated payload accepted from callers;
//! `AnalyticsEvent` is the enriched, immutable record that gets stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::error::Error;
use crate::limits::MAX_CUSTOM_DATA_BYTES;

/// Customer account type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum CustomerType {
    #[default]
    Individual,
    Business,
    Premium,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Business => "Business",
            Self::Premium => "Premium",
        }
    }
}

impl FromStr for CustomerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Individual" => Ok(Self::Individual),
            "Business" => Ok(Self::Business),
            "Premium" => Ok(Self::Premium),
            other => Err(Error::invalid_parameter(
                "customerType",
                format!("unknown customer type '{}'", other),
            )),
        }
    }
}

/// The fixed set of trackable event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    StorageSearch,
    UnitView,
    UnitBooking,
    PaymentCompleted,
    InventoryAdded,
    InventoryUpdated,
    SupportContacted,
    AppOpened,
    PageView,
    SessionStart,
    SessionEnd,
    FeatureUsed,
    ErrorOccurred,
}

impl EventType {
    pub const ALL: [EventType; 13] = [
        Self::StorageSearch,
        Self::UnitView,
        Self::UnitBooking,
        Self::PaymentCompleted,
        Self::InventoryAdded,
        Self::InventoryUpdated,
        Self::SupportContacted,
        Self::AppOpened,
        Self::PageView,
        Self::SessionStart,
        Self::SessionEnd,
        Self::FeatureUsed,
        Self::ErrorOccurred,
    ];

    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StorageSearch => "STORAGE_SEARCH",
            Self::UnitView => "UNIT_VIEW",
            Self::UnitBooking => "UNIT_BOOKING",
            Self::PaymentCompleted => "PAYMENT_COMPLETED",
            Self::InventoryAdded => "INVENTORY_ADDED",
            Self::InventoryUpdated => "INVENTORY_UPDATED",
            Self::SupportContacted => "SUPPORT_CONTACTED",
            Self::AppOpened => "APP_OPENED",
            Self::PageView => "PAGE_VIEW",
            Self::SessionStart => "SESSION_START",
            Self::SessionEnd => "SESSION_END",
            Self::FeatureUsed => "FEATURE_USED",
            Self::ErrorOccurred => "ERROR_OCCURRED",
        }
    }

    /// Looks up an event type by its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Category assigned when the caller does not provide one.
    pub fn default_category(&self) -> EventCategory {
        match self {
            Self::UnitBooking
            | Self::PaymentCompleted
            | Self::InventoryAdded
            | Self::InventoryUpdated => EventCategory::BusinessEvent,
            Self::SessionStart | Self::SessionEnd => EventCategory::SystemEvent,
            Self::ErrorOccurred => EventCategory::ErrorEvent,
            Self::StorageSearch
            | Self::UnitView
            | Self::SupportContacted
            | Self::AppOpened
            | Self::PageView
            | Self::FeatureUsed => EventCategory::UserBehavior,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            Error::invalid_parameter("eventType", format!("unknown event type '{}'", s))
        })
    }
}

/// Broad classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "User_Behavior")]
    UserBehavior,
    #[serde(rename = "Business_Event")]
    BusinessEvent,
    #[serde(rename = "System_Event")]
    SystemEvent,
    #[serde(rename = "Error_Event")]
    ErrorEvent,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserBehavior => "User_Behavior",
            Self::BusinessEvent => "Business_Event",
            Self::SystemEvent => "System_Event",
            Self::ErrorEvent => "Error_Event",
        }
    }
}

impl FromStr for EventCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User_Behavior" => Ok(Self::UserBehavior),
            "Business_Event" => Ok(Self::BusinessEvent),
            "System_Event" => Ok(Self::SystemEvent),
            "Error_Event" => Ok(Self::ErrorEvent),
            other => Err(Error::invalid_parameter(
                "eventCategory",
                format!("unknown event category '{}'", other),
            )),
        }
    }
}

/// Client platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    Web,
    Mobile,
    Tablet,
    Desktop,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "Web",
            Self::Mobile => "Mobile",
            Self::Tablet => "Tablet",
            Self::Desktop => "Desktop",
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Web" => Ok(Self::Web),
            "Mobile" => Ok(Self::Mobile),
            "Tablet" => Ok(Self::Tablet),
            "Desktop" => Ok(Self::Desktop),
            other => Err(Error::invalid_parameter(
                "platform",
                format!("unknown platform '{}'", other),
            )),
        }
    }
}

/// Channel the event arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataSource {
    Web,
    Mobile,
    #[default]
    #[serde(rename = "API")]
    Api,
    Batch,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "Web",
            Self::Mobile => "Mobile",
            Self::Api => "API",
            Self::Batch => "Batch",
        }
    }
}

impl FromStr for DataSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Web" => Ok(Self::Web),
            "Mobile" => Ok(Self::Mobile),
            "API" => Ok(Self::Api),
            "Batch" => Ok(Self::Batch),
            other => Err(Error::invalid_parameter(
                "dataSource",
                format!("unknown data source '{}'", other),
            )),
        }
    }
}

/// Geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinates {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Where the event happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[validate(length(max = 64))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[validate(length(max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[validate(length(max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[validate(length(max = 16))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Device and platform the event came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[validate(length(max = 64))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[validate(length(max = 64))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[validate(length(max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[validate(length(max = 32))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[validate(length(max = 512))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Validates free-form JSON size.
fn validate_custom_data_size(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return Ok(());
    }

    let size = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);

    if size > MAX_CUSTOM_DATA_BYTES {
        let mut err = ValidationError::new("custom_data_too_large");
        err.message = Some(
            format!(
                "custom data {}KB exceeds {}KB limit",
                size / 1024,
                MAX_CUSTOM_DATA_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Well-known domain fields carried by an event.
///
/// Aggregations read these by name: `revenue` for value scoring,
/// `conversionStep`/`funnelStage` for funnels, `loadTime`/`responseTime`
/// for performance. Anything else goes in `customData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventProperties {
    // Storage
    #[validate(length(max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_unit_id: Option<String>,
    #[validate(length(max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_id: Option<String>,
    #[validate(length(max = 64))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_size: Option<String>,
    #[validate(length(max = 64))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[validate(length(max = 64))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    // Inventory
    #[validate(length(max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_item_id: Option<String>,
    #[validate(length(max = 64))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_category: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_value: Option<f64>,

    // Navigation
    #[validate(length(max = 2048))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[validate(length(max = 2048))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_url: Option<String>,
    #[validate(length(max = 500))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[validate(custom(function = "validate_custom_data_size"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_criteria: Option<serde_json::Value>,

    // Performance
    #[validate(range(min = 0.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_time: Option<f64>,
    #[validate(range(min = 0.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,

    // Business
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[validate(length(min = 1, max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_step: Option<String>,
    #[validate(length(min = 1, max = 128))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funnel_stage: Option<String>,

    /// Arbitrary caller data (max 16KB)
    #[validate(custom(function = "validate_custom_data_size"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
}

/// Precomputed engagement signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    /// Session duration in seconds
    #[validate(range(min = 0.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_view_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
    /// Scroll depth as percentage (0-100)
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_depth: Option<f64>,
    /// Engagement score (0-100)
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    /// Satisfaction rating (0-5)
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satisfaction_rating: Option<f64>,
}

/// A/B experiment exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    #[validate(length(min = 1, max = 128))]
    pub experiment_id: String,
    #[validate(length(min = 1, max = 64))]
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_time: Option<DateTime<Utc>>,
}

/// Data quality bookkeeping stamped at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
    pub processing_time: DateTime<Utc>,
    #[serde(default)]
    pub data_source: DataSource,
}

/// Consent and retention settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Privacy {
    #[serde(default)]
    pub consent_given: bool,
    /// Records past this instant are eligible for purge.
    pub data_retention_expiry: DateTime<Utc>,
    #[serde(default)]
    pub anonymized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address_hashed: Option<String>,
}

/// Caller-supplied privacy settings; unset fields take defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyInput {
    pub consent_given: Option<bool>,
    pub data_retention_expiry: Option<DateTime<Utc>>,
    pub anonymized: Option<bool>,
    #[validate(length(max = 128))]
    pub ip_address_hashed: Option<String>,
}

/// Raw event payload as submitted by callers.
///
/// `eventType` stays a string here so an unknown type surfaces as a
/// missing-field error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    #[validate(length(min = 1, max = 128))]
    pub event_id: Option<String>,
    #[validate(length(max = 128))]
    pub customer_id: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub event_type: Option<String>,
    pub event_category: Option<EventCategory>,
    #[validate(length(min = 1, max = 128))]
    pub session_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub device: Option<Device>,
    #[serde(default)]
    pub properties: EventProperties,
    #[serde(default)]
    pub metrics: EngagementMetrics,
    #[validate(length(max = 32))]
    #[serde(default)]
    pub experiments: Vec<Experiment>,
    pub data_source: Option<DataSource>,
    pub privacy: Option<PrivacyInput>,
}

/// Projection returned by journey queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStep {
    pub event_type: EventType,
    pub event_category: EventCategory,
    pub timestamp: DateTime<Utc>,
    pub page_url: Option<String>,
    pub conversion_step: Option<String>,
    pub session_id: Option<String>,
}

/// A single stored analytics event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event_id: String,
    pub customer_id: String,
    pub customer_type: CustomerType,
    pub event_type: EventType,
    pub event_category: EventCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(default)]
    pub properties: EventProperties,
    #[serde(default)]
    pub metrics: EngagementMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<Experiment>,
    pub data_quality: DataQuality,
    pub privacy: Privacy,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Whether the event is tagged with the given funnel step.
    pub fn matches_step(&self, step: &str) -> bool {
        self.properties.conversion_step.as_deref() == Some(step)
            || self.properties.funnel_stage.as_deref() == Some(step)
    }

    /// Revenue attached to the event, only when positive.
    pub fn positive_revenue(&self) -> Option<f64> {
        self.properties.revenue.filter(|r| *r > 0.0)
    }

    pub fn platform(&self) -> Option<Platform> {
        self.device.as_ref().and_then(|d| d.platform)
    }

    pub fn country(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.country.as_deref())
    }

    /// Whether the retention deadline has passed at `as_of`.
    pub fn is_expired(&self, as_of: DateTime<Utc>) -> bool {
        self.privacy.data_retention_expiry < as_of
    }

    /// Age of the event in whole days, rounded up.
    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        let millis = (now - self.timestamp).num_milliseconds().abs();
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        (millis + DAY_MS - 1) / DAY_MS
    }

    pub fn journey_step(&self) -> JourneyStep {
        JourneyStep {
            event_type: self.event_type,
            event_category: self.event_category,
            timestamp: self.timestamp,
            page_url: self.properties.page_url.clone(),
            conversion_step: self.properties.conversion_step.clone(),
            session_id: self.session_id.clone(),
        }
    }
}
