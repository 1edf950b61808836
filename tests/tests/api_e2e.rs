//! End-to-end tests through the HTTP router over an in-memory store.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

async fn track(server: &TestServer, event: &Value) -> String {
    let response = server.post("/events").json(event).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["data"]["eventId"].as_str().unwrap().to_string()
}

/// Tracked events are immediately visible to listing
#[tokio::test]
async fn test_track_then_list_reads_own_write() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let customer = fixtures::customer();

    let response = server
        .post("/events")
        .json(&fixtures::event(&customer, "UNIT_VIEW"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let event_id = body["data"]["eventId"].as_str().unwrap().to_string();
    assert!(event_id.starts_with("evt_"));
    assert!(body["data"]["timestamp"].is_string());

    let response = server
        .get("/events")
        .add_query_param("customerId", &customer)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let events = body["data"]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["eventId"], event_id.as_str());
    assert_eq!(events[0]["eventCategory"], "User_Behavior");
    assert_eq!(body["data"]["pagination"]["totalCount"], 1);
}

/// Generated ids never collide
#[tokio::test]
async fn test_generated_ids_are_unique() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let customer = fixtures::customer();

    let mut ids = std::collections::HashSet::new();
    for _ in 0..25 {
        ids.insert(track(&server, &fixtures::event(&customer, "PAGE_VIEW")).await);
    }
    assert_eq!(ids.len(), 25);
}

/// Listing paginates and honors sort order
#[tokio::test]
async fn test_list_pagination_and_order() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let customer = fixtures::customer();
    let base = Utc::now() - Duration::hours(5);

    for i in 0..5 {
        track(
            &server,
            &fixtures::event_at(&customer, "PAGE_VIEW", base + Duration::minutes(i)),
        )
        .await;
    }

    let response = server
        .get("/events")
        .add_query_param("customerId", &customer)
        .add_query_param("limit", "2")
        .add_query_param("page", "3")
        .await;
    let body: Value = response.json();
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["totalPages"], 3);

    let response = server
        .get("/events")
        .add_query_param("customerId", &customer)
        .add_query_param("sortOrder", "asc")
        .await;
    let body: Value = response.json();
    let events = body["data"]["events"].as_array().unwrap();
    let first = events.first().unwrap()["timestamp"].as_str().unwrap().to_string();
    let last = events.last().unwrap()["timestamp"].as_str().unwrap().to_string();
    assert!(first < last);
}

/// A customer with no events gets zeroed insights, not an error
#[tokio::test]
async fn test_insights_for_unknown_customer_are_empty() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/customers/nobody/insights").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["customerId"], "nobody");
    assert_eq!(body["data"]["overview"]["totalEvents"], 0);
    assert_eq!(body["data"]["overview"]["uniqueSessions"], 0);
    assert!(body["data"]["journey"].as_array().unwrap().is_empty());
}

/// Journey is returned oldest first
#[tokio::test]
async fn test_journey_is_chronological() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let customer = fixtures::customer();
    let base = Utc::now() - Duration::hours(3);

    track(&server, &fixtures::event_at(&customer, "UNIT_BOOKING", base + Duration::minutes(20))).await;
    track(&server, &fixtures::event_at(&customer, "STORAGE_SEARCH", base)).await;
    track(&server, &fixtures::event_at(&customer, "UNIT_VIEW", base + Duration::minutes(10))).await;

    let response = server
        .get(&format!("/customers/{}/journey", customer))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let types: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["STORAGE_SEARCH", "UNIT_VIEW", "UNIT_BOOKING"]);
}

/// 100 searchers, 60 viewers, 20 bookers
#[tokio::test]
async fn test_funnel_scenario() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let prefix = fixtures::customer();

    for i in 0..100 {
        let c = format!("{}_{}", prefix, i);
        track(&server, &fixtures::step_event(&c, "STORAGE_SEARCH")).await;
        if i < 60 {
            track(&server, &fixtures::step_event(&c, "UNIT_VIEW")).await;
        }
        if i < 20 {
            track(&server, &fixtures::step_event(&c, "UNIT_BOOKING")).await;
        }
    }

    let response = server
        .get("/funnel")
        .add_query_param("steps", "STORAGE_SEARCH,UNIT_VIEW,UNIT_BOOKING")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let data = &body["data"];
    let rates: Vec<f64> = data["perStep"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["conversionRate"].as_f64().unwrap())
        .collect();

    assert_eq!(rates[0], 100.0);
    assert!((rates[1] - 60.0).abs() < 1e-9);
    assert!((rates[2] - 33.33).abs() < 0.01);
    assert!((data["totalConversionRate"].as_f64().unwrap() - 20.0).abs() < 1e-6);
    assert_eq!(data["biggestDropoff"]["step"], "UNIT_BOOKING");
}

/// $500 of bookings lands in the Medium value segment
#[tokio::test]
async fn test_predictions_value_scenario() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let customer = fixtures::customer();

    track(&server, &fixtures::event(&customer, "UNIT_VIEW")).await;
    track(&server, &fixtures::revenue_event(&customer, "UNIT_BOOKING", 500.0)).await;

    let response = server
        .get(&format!("/customers/{}/predictions", customer))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let data = &body["data"];
    assert_eq!(data["customerValue"]["totalRevenue"], 500.0);
    assert_eq!(data["customerValue"]["predictedLifetimeValue"], 1250.0);
    assert_eq!(data["customerValue"]["valueSegment"], "Medium");
    assert_eq!(data["churnRisk"]["score"], "Medium");

    let confidence = data["confidence"].as_f64().unwrap();
    assert!((0.7..=1.0).contains(&confidence));
    assert_eq!(data["recommendations"][0]["type"], "Product");
}

/// Cohort retention rates stay within [0, 1]
#[tokio::test]
async fn test_cohort_rates_are_fractions() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let now = Utc::now();

    for i in 0..4 {
        let c = format!("{}_{}", fixtures::customer(), i);
        track(&server, &fixtures::event_at(&c, "APP_OPENED", now - Duration::days(5))).await;
        if i % 2 == 0 {
            track(&server, &fixtures::event_at(&c, "APP_OPENED", now - Duration::days(4))).await;
        }
    }

    let start = (now - Duration::days(6)).format("%Y-%m-%d").to_string();
    let response = server
        .get("/cohort")
        .add_query_param("cohortType", "daily")
        .add_query_param("retentionPeriods", "1,2")
        .add_query_param("startDate", &start)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let cohorts = body["data"]["cohorts"].as_array().unwrap();
    assert!(!cohorts.is_empty());

    for cohort in cohorts {
        for period in cohort["retention"].as_array().unwrap() {
            if let Some(rate) = period["rate"].as_f64() {
                assert!((0.0..=1.0).contains(&rate));
            }
        }
    }
    assert_eq!(body["data"]["averageRetention"][0]["rate"], 0.5);
}

/// Business endpoints respond over seeded data, and segments narrow results
#[tokio::test]
async fn test_business_dashboards() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let customer = fixtures::customer();

    track(&server, &fixtures::mobile_event(&customer, "APP_OPENED", "US")).await;
    track(&server, &fixtures::mobile_event(&customer, "UNIT_VIEW", "CA")).await;
    track(&server, &fixtures::event(&customer, "ERROR_OCCURRED")).await;

    let response = server
        .get("/business/dashboard")
        .add_query_param("granularity", "weekly")
        .add_query_param("segments", "platform:Mobile,country:US")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["overview"]["totalEvents"], 1);
    assert_eq!(body["data"]["granularity"], "weekly");

    let response = server
        .get("/business/realtime")
        .add_query_param("windowMinutes", "15")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["windowMinutes"], 15);
    assert!(body["data"]["currentEvents"].as_u64().unwrap() >= 3);
    assert!(body["data"]["systemHealth"]["errorEvents"].as_u64().unwrap() >= 1);

    let response = server
        .get("/business/summary")
        .add_query_param("period", "7d")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["period"], "7d");
}

/// Expired events disappear after cleanup, and cleanup is idempotent
#[tokio::test]
async fn test_cleanup_removes_expired_events() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let customer = fixtures::customer();

    track(&server, &fixtures::expired_event(&customer)).await;
    track(&server, &fixtures::expired_event(&customer)).await;
    let live = track(&server, &fixtures::event(&customer, "PAGE_VIEW")).await;

    let response = server.delete("/cleanup/expired").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["deletedRecords"], 2);
    assert!(body["data"]["cleanupTime"].is_string());

    let body: Value = server.delete("/cleanup/expired").await.json();
    assert_eq!(body["data"]["deletedRecords"], 0);

    let body: Value = server
        .get("/events")
        .add_query_param("customerId", &customer)
        .await
        .json();
    let events = body["data"]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["eventId"], live.as_str());
}
