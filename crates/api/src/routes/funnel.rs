//! Conversion funnel endpoint.

use axum::extract::{Query, State};
use chrono::Utc;
use tracing::debug;

use insights_analytics::FunnelReport;

use crate::extractors::{Deadline, FunnelQuery};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /funnel?steps=a,b,c
pub async fn funnel_handler(
    State(state): State<AppState>,
    Deadline(deadline): Deadline,
    Query(query): Query<FunnelQuery>,
) -> ApiResult<FunnelReport> {
    let (steps, range, segments) = query.parse(Utc::now())?;
    debug!(steps = ?steps, "Analyzing conversion funnel");

    let report = state
        .engine
        .analyze_funnel(&steps, range, segments, deadline)
        .await?;
    Ok(ApiResponse::ok(report))
}
