//! Service info and health check endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use telemetry::{health, HealthReport, MetricsSnapshot};

use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

const SERVICE_NAME: &str = "insights-engine";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub backend: &'static str,
    pub started_at: DateTime<Utc>,
    pub endpoints: Vec<&'static str>,
}

/// GET / - Service description.
pub async fn index_handler(State(state): State<AppState>) -> Json<ApiResponse<ServiceInfo>> {
    ApiResponse::ok(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: "Customer behavior analytics and business intelligence",
        backend: state.store().backend(),
        started_at: state.started_at,
        endpoints: vec![
            "GET /health",
            "POST /events",
            "GET /events",
            "GET /customers/:customerId/insights",
            "GET /customers/:customerId/journey",
            "GET /customers/:customerId/predictions",
            "GET /business/dashboard",
            "GET /business/realtime",
            "GET /business/summary",
            "GET /funnel",
            "GET /cohort",
            "DELETE /cleanup/expired",
        ],
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    #[serde(flatten)]
    pub report: HealthReport,
    pub metrics: MetricsSnapshot,
}

/// GET /health - Probes the store and reports record count.
pub async fn health_handler(State(state): State<AppState>) -> axum::response::Response {
    let registry = health();
    let record_count = match worker::probe_store(state.store().as_ref()).await {
        Ok(count) => count,
        Err(e) => {
            return ApiError::with_code(
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_001",
                format!("Service health check failed: {}", e),
            )
            .into_response();
        }
    };

    ApiResponse::with_message(
        HealthBody {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            report: HealthReport {
                record_count,
                ..registry.report()
            },
            metrics: telemetry::metrics().snapshot(),
        },
        "Service is running",
    )
    .into_response()
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
