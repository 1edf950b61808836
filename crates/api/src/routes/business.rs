//! Business-wide dashboards.

use axum::extract::{Query, State};
use chrono::Utc;

use insights_analytics::{AnalyticsSummary, BusinessAnalytics, RealtimeSnapshot};

use crate::extractors::{DashboardQuery, Deadline, RealtimeQuery, SummaryQuery};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /business/dashboard
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Deadline(deadline): Deadline,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<BusinessAnalytics> {
    let (range, granularity, segments) = query.parse(Utc::now())?;
    let analytics = state
        .engine
        .business_analytics(range, granularity, segments, deadline)
        .await?;
    Ok(ApiResponse::ok(analytics))
}

/// GET /business/realtime
pub async fn realtime_handler(
    State(state): State<AppState>,
    Deadline(deadline): Deadline,
    Query(query): Query<RealtimeQuery>,
) -> ApiResult<RealtimeSnapshot> {
    let snapshot = state
        .engine
        .realtime_snapshot(query.window()?, deadline)
        .await?;
    Ok(ApiResponse::ok(snapshot))
}

/// GET /business/summary
pub async fn summary_handler(
    State(state): State<AppState>,
    Deadline(deadline): Deadline,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<AnalyticsSummary> {
    let summary = state
        .engine
        .analytics_summary(query.days()?, deadline)
        .await?;
    Ok(ApiResponse::ok(summary))
}
