//! Event predicate used by store lookups and counts.

use serde::{Deserialize, Serialize};

use crate::events::{AnalyticsEvent, EventCategory, EventType};
use crate::query::{DateRange, Segments};

/// Conjunction of optional conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    pub customer_id: Option<String>,
    pub event_type: Option<EventType>,
    pub event_category: Option<EventCategory>,
    pub session_id: Option<String>,
    pub range: Option<DateRange>,
    #[serde(default)]
    pub segments: Segments,
    /// Only events carrying a conversion step.
    #[serde(default)]
    pub conversions_only: bool,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Self::default()
        }
    }

    pub fn for_type(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            ..Self::default()
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_optional_range(mut self, range: Option<DateRange>) -> Self {
        self.range = range;
        self
    }

    pub fn with_segments(mut self, segments: Segments) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.event_category = Some(category);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn conversions_only(mut self) -> Self {
        self.conversions_only = true;
        self
    }

    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        if let Some(ref id) = self.customer_id {
            if &event.customer_id != id {
                return false;
            }
        }
        if let Some(t) = self.event_type {
            if event.event_type != t {
                return false;
            }
        }
        if let Some(c) = self.event_category {
            if event.event_category != c {
                return false;
            }
        }
        if let Some(ref session) = self.session_id {
            if event.session_id.as_ref() != Some(session) {
                return false;
            }
        }
        if let Some(range) = self.range {
            if !range.contains(event.timestamp) {
                return false;
            }
        }
        if self.conversions_only && event.properties.conversion_step.is_none() {
            return false;
        }
        self.segments.matches(event)
    }
}
