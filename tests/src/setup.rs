//! Common test setup functions.

use api::{router, AppState};
use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use event_store::{EventStore, MemoryStore};
use insights_analytics::EngineConfig;
use insights_core::{AnalyticsEvent, Error, EventFilter, Result};

/// Router wired to a real engine over the given store.
///
/// The same router, layers and handlers the binary serves; only the store
/// differs between suites.
pub struct TestContext {
    pub store: Arc<dyn EventStore>,
    pub router: Router,
}

impl TestContext {
    /// Fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn EventStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn EventStore>, config: EngineConfig) -> Self {
        let state = AppState::new(store.clone(), config);
        Self {
            store,
            router: router(state),
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Store whose reads stall well past any test deadline.
pub struct StallingStore {
    pub delay: Duration,
}

/// Store that is unreachable.
pub struct UnreachableStore;

#[async_trait]
impl EventStore for StallingStore {
    fn backend(&self) -> &'static str {
        "stalling"
    }
    async fn append(&self, event: AnalyticsEvent) -> Result<String> {
        Ok(event.event_id)
    }
    async fn find(&self, _filter: &EventFilter) -> Result<Vec<AnalyticsEvent>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![])
    }
    async fn count_matching(&self, _filter: &EventFilter) -> Result<u64> {
        tokio::time::sleep(self.delay).await;
        Ok(0)
    }
    async fn delete_expired_batch(&self, _as_of: DateTime<Utc>, _limit: usize) -> Result<u64> {
        Ok(0)
    }
    async fn count_all(&self) -> Result<u64> {
        Ok(0)
    }
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl EventStore for UnreachableStore {
    fn backend(&self) -> &'static str {
        "unreachable"
    }
    async fn append(&self, _event: AnalyticsEvent) -> Result<String> {
        Err(Error::store_unavailable("connection refused"))
    }
    async fn find(&self, _filter: &EventFilter) -> Result<Vec<AnalyticsEvent>> {
        Err(Error::store_unavailable("connection refused"))
    }
    async fn count_matching(&self, _filter: &EventFilter) -> Result<u64> {
        Err(Error::store_unavailable("connection refused"))
    }
    async fn delete_expired_batch(&self, _as_of: DateTime<Utc>, _limit: usize) -> Result<u64> {
        Err(Error::store_unavailable("connection refused"))
    }
    async fn count_all(&self) -> Result<u64> {
        Err(Error::store_unavailable("connection refused"))
    }
    async fn ping(&self) -> Result<()> {
        Err(Error::store_unavailable("connection refused"))
    }
}
