//! Retention policy for stored events.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Default purge batch size.
pub const DEFAULT_PURGE_BATCH_SIZE: usize = 1000;

/// How long events live and how they are purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Retention in days; 365 means one calendar year.
    pub retention_days: u32,
    /// Records removed per delete round trip.
    pub purge_batch_size: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_days: 365,
            purge_batch_size: DEFAULT_PURGE_BATCH_SIZE,
        }
    }
}

impl RetentionPolicy {
    pub fn new(retention_days: u32, purge_batch_size: usize) -> Self {
        Self {
            retention_days: retention_days.max(1),
            purge_batch_size: purge_batch_size.max(1),
        }
    }

    /// Expiry assigned to an event created at `created_at`.
    pub fn expiry_for(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        if self.retention_days == 365 {
            if let Some(expiry) = created_at.checked_add_months(Months::new(12)) {
                return expiry;
            }
        }
        created_at + Duration::days(i64::from(self.retention_days))
    }
}
