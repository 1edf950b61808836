//! ClickHouse backend tests.
//!
//! Requires Docker (or `INSIGHTS_TEST_CLICKHOUSE_URL`); run with
//! `cargo test -p integration-tests --test clickhouse_store -- --ignored`.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;

use event_store::{ClickHouseStore, EventStore};
use insights_core::{validate_and_enrich, EventFilter, EventInput, PrivacyInput};
use integration_tests::{containers::TestContainers, fixtures, setup::TestContext};

async fn connect(containers: &TestContainers) -> ClickHouseStore {
    ClickHouseStore::connect(containers.clickhouse_config())
        .await
        .expect("Failed to connect to ClickHouse")
}

fn event_for(customer: &str, event_type: &str) -> EventInput {
    EventInput {
        customer_id: Some(customer.to_string()),
        event_type: Some(event_type.to_string()),
        ..EventInput::default()
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_append_find_and_duplicate() {
    let containers = TestContainers::start().await;
    let store = connect(&containers).await;
    store.ping().await.expect("ClickHouse should answer ping");

    let customer = fixtures::customer();
    let now = Utc::now();
    let event = validate_and_enrich(event_for(&customer, "UNIT_VIEW"), now).unwrap();
    let id = store.append(event.clone()).await.unwrap();

    let err = store.append(event).await.unwrap_err();
    assert_eq!(err.code().code(), "EVENT_001");

    let found = store.find(&EventFilter::for_customer(&customer)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].event_id, id);
    assert_eq!(
        store
            .count_matching(&EventFilter::for_customer(&customer))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_journey_and_purge() {
    let containers = TestContainers::start().await;
    let store = connect(&containers).await;
    let customer = fixtures::customer();
    let now = Utc::now();

    for (i, event_type) in ["STORAGE_SEARCH", "UNIT_VIEW", "UNIT_BOOKING"].iter().enumerate() {
        let mut input = event_for(&customer, event_type);
        input.timestamp = Some(now - Duration::minutes(30 - i as i64));
        if i == 0 {
            input.privacy = Some(PrivacyInput {
                data_retention_expiry: Some(now - Duration::days(1)),
                ..PrivacyInput::default()
            });
        }
        store.append(validate_and_enrich(input, now).unwrap()).await.unwrap();
    }

    let journey = store.query_journey(&customer, None).await.unwrap();
    let types: Vec<&str> = journey.iter().map(|s| s.event_type.as_str()).collect();
    assert_eq!(types, vec!["STORAGE_SEARCH", "UNIT_VIEW", "UNIT_BOOKING"]);

    assert!(store.delete_expired(now).await.unwrap() >= 1);
    assert_eq!(store.delete_expired(now).await.unwrap(), 0);

    let remaining = store.query_by_customer(&customer, None).await.unwrap();
    assert_eq!(remaining.len(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_http_round_trip_over_clickhouse() {
    let containers = TestContainers::start().await;
    let store = connect(&containers).await;
    let ctx = TestContext::with_store(Arc::new(store));
    let server = ctx.server();
    let customer = fixtures::customer();

    server
        .post("/events")
        .json(&fixtures::revenue_event(&customer, "UNIT_BOOKING", 1500.0))
        .await
        .assert_status(StatusCode::CREATED);

    let body: Value = server
        .get(&format!("/customers/{}/predictions", customer))
        .await
        .json();
    assert_eq!(body["data"]["customerValue"]["valueSegment"], "High");

    let response = server.get("/health").await;
    response.assert_status_ok();
}
