//! Per-customer insights, journey and predictions.

use axum::extract::{Path, Query, State};
use chrono::Utc;

use insights_analytics::{CustomerInsights, PredictiveInsights};
use insights_core::{Error, JourneyStep};

use crate::extractors::{Deadline, InsightsQuery, JourneyQuery};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

fn customer_id(raw: String) -> Result<String, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::missing_field("customerId"));
    }
    Ok(trimmed.to_string())
}

/// GET /customers/:customer_id/insights
pub async fn insights_handler(
    State(state): State<AppState>,
    Path(customer): Path<String>,
    Deadline(deadline): Deadline,
    Query(query): Query<InsightsQuery>,
) -> ApiResult<CustomerInsights> {
    let customer = customer_id(customer)?;
    let range = query.range(Utc::now())?;
    let insights = state
        .engine
        .customer_insights(&customer, range, deadline)
        .await?;
    Ok(ApiResponse::ok(insights))
}

/// GET /customers/:customer_id/journey - Oldest step first.
pub async fn journey_handler(
    State(state): State<AppState>,
    Path(customer): Path<String>,
    Deadline(deadline): Deadline,
    Query(query): Query<JourneyQuery>,
) -> ApiResult<Vec<JourneyStep>> {
    let customer = customer_id(customer)?;
    let steps = state
        .engine
        .journey(&customer, query.session_id.as_deref(), query.limit()?, deadline)
        .await?;
    Ok(ApiResponse::ok(steps))
}

/// GET /customers/:customer_id/predictions
pub async fn predictions_handler(
    State(state): State<AppState>,
    Path(customer): Path<String>,
    Deadline(deadline): Deadline,
) -> ApiResult<PredictiveInsights> {
    let customer = customer_id(customer)?;
    let insights = state.engine.predictive_insights(&customer, deadline).await?;
    Ok(ApiResponse::ok(insights))
}
