//! Cohort retention endpoint.

use axum::extract::{Query, State};
use chrono::Utc;

use insights_analytics::CohortReport;

use crate::extractors::{CohortQuery, Deadline};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /cohort
pub async fn cohort_handler(
    State(state): State<AppState>,
    Deadline(deadline): Deadline,
    Query(query): Query<CohortQuery>,
) -> ApiResult<CohortReport> {
    let request = query.parse(Utc::now())?;
    let report = state.engine.analyze_cohorts(request, deadline).await?;
    Ok(ApiResponse::ok(report))
}
