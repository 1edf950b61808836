//! Unified error types for the insights engine.
//!
//! Every variant carries a stable error code:
//! - VALID_001-002: Event validation errors
//! - EVENT_001: Write path conflicts
//! - QUERY_001-005: Query parameter and deadline errors
//! - STORE_001: Persistence errors
//! - INTERNAL_001: Everything else

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// VALID_001: Malformed event field
    InvalidEvent,
    /// VALID_002: Required field missing or unrecognized
    MissingField,
    /// EVENT_001: Event id already stored
    DuplicateEvent,
    /// QUERY_001: Date range starts after it ends
    InvalidRange,
    /// QUERY_002: Funnel step list unusable
    InvalidFunnel,
    /// QUERY_003: Unsupported cohort granularity
    InvalidCohort,
    /// QUERY_004: Any other malformed query parameter
    InvalidParameter,
    /// QUERY_005: Query deadline exceeded
    Timeout,
    /// STORE_001: Underlying persistence unreachable
    StoreUnavailable,
    /// INTERNAL_001: Unexpected failure
    Internal,
}

impl ErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEvent => "VALID_001",
            Self::MissingField => "VALID_002",
            Self::DuplicateEvent => "EVENT_001",
            Self::InvalidRange => "QUERY_001",
            Self::InvalidFunnel => "QUERY_002",
            Self::InvalidCohort => "QUERY_003",
            Self::InvalidParameter => "QUERY_004",
            Self::Timeout => "QUERY_005",
            Self::StoreUnavailable => "STORE_001",
            Self::Internal => "INTERNAL_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidEvent
            | Self::MissingField
            | Self::InvalidRange
            | Self::InvalidFunnel
            | Self::InvalidCohort
            | Self::InvalidParameter => 400,
            Self::DuplicateEvent => 409,
            Self::Timeout => 504,
            Self::StoreUnavailable => 503,
            Self::Internal => 500,
        }
    }
}

/// Unified error type for the insights engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("duplicate event id: {0}")]
    DuplicateEventId(String),

    #[error("invalid date range: from {from} is after to {to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("invalid funnel definition: {0}")]
    InvalidFunnelDefinition(String),

    #[error("invalid cohort type: {0}")]
    InvalidCohortType(String),

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("{operation} exceeded its {timeout_ms}ms deadline")]
    QueryTimeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingRequiredField(field.into())
    }

    pub fn invalid_funnel(msg: impl Into<String>) -> Self {
        Self::InvalidFunnelDefinition(msg.into())
    }

    pub fn invalid_parameter(name: &'static str, msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: msg.into(),
        }
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::InvalidEvent,
            Self::MissingRequiredField(_) => ErrorCode::MissingField,
            Self::DuplicateEventId(_) => ErrorCode::DuplicateEvent,
            Self::InvalidRange { .. } => ErrorCode::InvalidRange,
            Self::InvalidFunnelDefinition(_) => ErrorCode::InvalidFunnel,
            Self::InvalidCohortType(_) => ErrorCode::InvalidCohort,
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Self::QueryTimeout { .. } => ErrorCode::Timeout,
            Self::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            Self::Serialization(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Whether the caller can fix this by changing its input.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        let err = Error::missing_field("customerId");
        assert_eq!(err.code().code(), "VALID_002");
        assert_eq!(err.http_status(), 400);

        let err = Error::DuplicateEventId("evt_1".into());
        assert_eq!(err.http_status(), 409);
        assert!(err.is_client_error());

        let err = Error::QueryTimeout {
            operation: "funnel",
            timeout_ms: 100,
        };
        assert_eq!(err.code().code(), "QUERY_005");
        assert!(!err.is_client_error());

        assert_eq!(Error::store_unavailable("down").http_status(), 503);
    }
}
