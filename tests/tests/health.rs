//! Tests for service info and health endpoints.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

/// GET / describes the service
#[tokio::test]
async fn test_index_describes_service() {
    let server = TestContext::new().server();

    let response = server.get("/").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["service"], "insights-engine");
    assert_eq!(body["data"]["backend"], "memory");
    assert!(!body["data"]["endpoints"].as_array().unwrap().is_empty());
}

/// GET /health reports a reachable store and its record count
#[tokio::test]
async fn test_health_reports_record_count() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server
        .post("/events")
        .json(&fixtures::event("c1", "APP_OPENED"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body["data"]["recordCount"].as_u64().unwrap() >= 1);
    assert!(body["data"]["metrics"].is_object());
}

/// Probes answer once the store has been checked
#[tokio::test]
async fn test_probes() {
    let server = TestContext::new().server();

    // /health refreshes the store component first
    server.get("/health").await.assert_status_ok();

    server.get("/health/ready").await.assert_status(StatusCode::OK);
    server.get("/health/live").await.assert_status(StatusCode::OK);
}
