//! Append-only event storage.
//!
//! `EventStore` is the seam between the analytics engine and persistence.
//! A handle is built once at startup and shared as `Arc<dyn EventStore>`.

pub mod memory;
pub mod warehouse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insights_core::{
    AnalyticsEvent, DateRange, EventFilter, EventType, JourneyStep, Result,
    DEFAULT_PURGE_BATCH_SIZE,
};

pub use memory::MemoryStore;
pub use warehouse::{ClickHouseConfig, ClickHouseStore};

/// Persistence contract for analytics events.
///
/// Implementations must make each append atomic: a record is either fully
/// visible or absent. Reads may or may not observe concurrent deletes.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Persists a new event. Fails with `DuplicateEventId` on id collision.
    async fn append(&self, event: AnalyticsEvent) -> Result<String>;

    /// All events matching `filter`, newest first.
    async fn find(&self, filter: &EventFilter) -> Result<Vec<AnalyticsEvent>>;

    async fn count_matching(&self, filter: &EventFilter) -> Result<u64>;

    /// Deletes up to `limit` events whose retention expiry is before `as_of`.
    async fn delete_expired_batch(&self, as_of: DateTime<Utc>, limit: usize) -> Result<u64>;

    async fn count_all(&self) -> Result<u64>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<()>;

    /// Releases backend resources. Called once by the owner at shutdown.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn query_by_customer(
        &self,
        customer_id: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<AnalyticsEvent>> {
        self.find(&EventFilter::for_customer(customer_id).with_optional_range(range))
            .await
    }

    async fn query_by_type(
        &self,
        event_type: EventType,
        range: Option<DateRange>,
    ) -> Result<Vec<AnalyticsEvent>> {
        self.find(&EventFilter::for_type(event_type).with_optional_range(range))
            .await
    }

    /// A customer's path through the product, oldest first.
    async fn query_journey(
        &self,
        customer_id: &str,
        session_id: Option<&str>,
    ) -> Result<Vec<JourneyStep>> {
        let mut filter = EventFilter::for_customer(customer_id);
        if let Some(session) = session_id {
            filter = filter.with_session(session);
        }
        let events = self.find(&filter).await?;
        Ok(events.iter().rev().map(AnalyticsEvent::journey_step).collect())
    }

    /// Deletes every expired event, one batch at a time. Idempotent.
    async fn delete_expired(&self, as_of: DateTime<Utc>) -> Result<u64> {
        let mut total = 0;
        loop {
            let deleted = self
                .delete_expired_batch(as_of, DEFAULT_PURGE_BATCH_SIZE)
                .await?;
            total += deleted;
            if deleted < DEFAULT_PURGE_BATCH_SIZE as u64 {
                return Ok(total);
            }
            tokio::task::yield_now().await;
        }
    }
}
