//! Event ingestion and listing.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::{debug, info};

use insights_analytics::{EventPage, TrackedEvent};
use insights_core::{validate_event_size, Error, EventInput};

use crate::extractors::{Deadline, ListEventsQuery};
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /events - Validates, enriches and stores one event.
pub async fn track_event_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<TrackedEvent>>), ApiError> {
    validate_event_size(&body)?;

    let input: EventInput = serde_json::from_slice(&body)
        .map_err(|e| Error::validation(format!("malformed event body: {}", e)))?;

    debug!(
        customer_id = input.customer_id.as_deref().unwrap_or(""),
        event_type = input.event_type.as_deref().unwrap_or(""),
        payload_size = body.len(),
        "Tracking event"
    );

    let tracked = state.engine.track_event(input).await?;
    info!(event_id = %tracked.event_id, "Event tracked");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(tracked, "Event tracked successfully"),
    ))
}

/// GET /events - Paginated listing.
pub async fn list_events_handler(
    State(state): State<AppState>,
    Deadline(deadline): Deadline,
    Query(query): Query<ListEventsQuery>,
) -> ApiResult<EventPage> {
    let (filter, pagination, order) = query.parse(Utc::now())?;
    let page = state
        .engine
        .list_events(filter, pagination, order, deadline)
        .await?;
    Ok(ApiResponse::ok(page))
}
