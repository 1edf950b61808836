//! Error envelopes and codes returned by the API.

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use integration_tests::{
    fixtures,
    setup::{StallingStore, TestContext, UnreachableStore},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn assert_error(response: TestResponse, status: StatusCode, code: &str) {
    response.assert_status(status);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], code, "unexpected body: {}", body);
    assert!(body["error"].is_string());
}

fn server() -> TestServer {
    TestContext::new().server()
}

#[tokio::test]
async fn test_missing_customer_id_returns_valid_002() {
    let response = server()
        .post("/events")
        .json(&json!({ "eventType": "PAGE_VIEW" }))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALID_002");
}

#[tokio::test]
async fn test_unknown_event_type_returns_valid_002() {
    let response = server()
        .post("/events")
        .json(&fixtures::event("c1", "TELEPORTED"))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALID_002");
}

#[tokio::test]
async fn test_malformed_body_returns_valid_001() {
    let response = server()
        .post("/events")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALID_001");
}

#[tokio::test]
async fn test_out_of_range_metrics_return_valid_001() {
    let mut event = fixtures::event("c1", "PAGE_VIEW");
    event["metrics"] = json!({ "scrollDepth": 140.0 });

    let response = server().post("/events").json(&event).await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALID_001");
}

#[tokio::test]
async fn test_oversized_event_is_rejected() {
    let response = server()
        .post("/events")
        .json(&fixtures::oversized_event())
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALID_001");
}

#[tokio::test]
async fn test_duplicate_event_id_returns_409() {
    let server = server();
    let mut event = fixtures::event("c1", "PAGE_VIEW");
    event["eventId"] = json!("evt_duplicate");

    server.post("/events").json(&event).await.assert_status(StatusCode::CREATED);
    let response = server.post("/events").json(&event).await;
    assert_error(response, StatusCode::CONFLICT, "EVENT_001");
}

#[tokio::test]
async fn test_inverted_date_range_returns_query_001() {
    let response = server()
        .get("/business/dashboard")
        .add_query_param("dateRange", "2024-03-01,2024-02-01")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_001");
}

#[tokio::test]
async fn test_funnel_definition_errors_return_query_002() {
    let server = server();

    let response = server.get("/funnel").await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_002");

    let response = server
        .get("/funnel")
        .add_query_param("steps", "a,b,a")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_002");
}

#[tokio::test]
async fn test_unknown_cohort_type_returns_query_003() {
    let response = server()
        .get("/cohort")
        .add_query_param("cohortType", "hourly")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_003");
}

#[tokio::test]
async fn test_bad_parameters_return_query_004() {
    let server = server();

    let response = server
        .get("/business/dashboard")
        .add_query_param("granularity", "yearly")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_004");

    let response = server
        .get("/business/dashboard")
        .add_query_param("segments", "planet:Mars")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_004");

    let response = server
        .get("/business/summary")
        .add_query_param("period", "month")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_004");

    let response = server
        .get("/events")
        .add_query_param("limit", "5000")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_004");

    let response = server
        .get("/business/realtime")
        .add_query_param("windowMinutes", "0")
        .await;
    assert_error(response, StatusCode::BAD_REQUEST, "QUERY_004");
}

#[tokio::test]
async fn test_deadline_exceeded_returns_504() {
    let ctx = TestContext::with_store(Arc::new(StallingStore {
        delay: Duration::from_secs(5),
    }));
    let server = ctx.server();

    let response = server
        .get("/funnel")
        .add_query_param("steps", "STORAGE_SEARCH,UNIT_VIEW")
        .add_header("x-query-timeout-ms", "25")
        .await;
    assert_error(response, StatusCode::GATEWAY_TIMEOUT, "QUERY_005");
}

#[tokio::test]
async fn test_unreachable_store_returns_503() {
    let ctx = TestContext::with_store(Arc::new(UnreachableStore));
    let server = ctx.server();

    let response = server
        .post("/events")
        .json(&fixtures::event("c1", "PAGE_VIEW"))
        .await;
    assert_error(response, StatusCode::SERVICE_UNAVAILABLE, "STORE_001");

    let response = server.get("/health").await;
    assert_error(response, StatusCode::SERVICE_UNAVAILABLE, "STORE_001");
}

#[tokio::test]
async fn test_unknown_route_returns_404_envelope() {
    let response = server().get("/nope").await;
    assert_error(response, StatusCode::NOT_FOUND, "NOT_FOUND");
}
