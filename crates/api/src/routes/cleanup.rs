//! Compliance purge endpoint.

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    pub deleted_records: u64,
    pub cleanup_time: DateTime<Utc>,
}

/// DELETE /cleanup/expired - Removes every event past its retention expiry.
pub async fn cleanup_expired_handler(State(state): State<AppState>) -> ApiResult<CleanupResult> {
    let now = Utc::now();
    let report = state.retention.purge_expired(now).await?;
    info!(deleted = report.deleted_count, "Cleanup requested via API");

    Ok(ApiResponse::with_message(
        CleanupResult {
            deleted_records: report.deleted_count,
            cleanup_time: now,
        },
        "Data cleanup completed",
    ))
}
