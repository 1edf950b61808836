//! API routes.

pub mod business;
pub mod cleanup;
pub mod cohort;
pub mod customers;
pub mod events;
pub mod funnel;
pub mod health;

use axum::{
    routing::{delete, get},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health::index_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route(
            "/events",
            get(events::list_events_handler).post(events::track_event_handler),
        )
        .route("/customers/:customer_id/insights", get(customers::insights_handler))
        .route("/customers/:customer_id/journey", get(customers::journey_handler))
        .route(
            "/customers/:customer_id/predictions",
            get(customers::predictions_handler),
        )
        .route("/business/dashboard", get(business::dashboard_handler))
        .route("/business/realtime", get(business::realtime_handler))
        .route("/business/summary", get(business::summary_handler))
        .route("/funnel", get(funnel::funnel_handler))
        .route("/cohort", get(cohort::cohort_handler))
        .route("/cleanup/expired", delete(cleanup::cleanup_expired_handler))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
