//! Size and range limits for tracked events.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

/// Maximum single serialized event size in bytes (32KB).
pub const MAX_EVENT_SIZE_BYTES: usize = 32 * 1024;

/// Maximum `customData` / `filterCriteria` JSON size in bytes (16KB).
pub const MAX_CUSTOM_DATA_BYTES: usize = 16 * 1024;

/// Identifier max length (event, customer, session, facility ids).
pub const MAX_ID_LEN: usize = 128;

/// URL max length (page and referrer URLs).
pub const MAX_URL_LEN: usize = 2048;

/// User agent string max length.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// Free-text search query max length.
pub const MAX_SEARCH_QUERY_LEN: usize = 500;

/// Maximum experiments attached to one event.
pub const MAX_EXPERIMENTS: usize = 32;

/// Scroll depth is a percentage.
pub const MAX_SCROLL_DEPTH: f64 = 100.0;

/// Engagement score upper bound.
pub const MAX_ENGAGEMENT_SCORE: f64 = 100.0;

/// Satisfaction rating upper bound (five-star scale).
pub const MAX_SATISFACTION_RATING: f64 = 5.0;

// === Query Limits ===

/// Default page size for event listings and journeys.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Default lookback for date ranges (days).
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Default real-time window (minutes).
pub const DEFAULT_REALTIME_WINDOW_MINUTES: i64 = 60;

/// Longest real-time window accepted (one day).
pub const MAX_REALTIME_WINDOW_MINUTES: i64 = 24 * 60;

/// Maximum number of funnel steps.
pub const MAX_FUNNEL_STEPS: usize = 20;

/// Largest retention period offset accepted for cohorts.
pub const MAX_RETENTION_PERIOD: u32 = 366;
