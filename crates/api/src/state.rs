//! Application state shared across handlers.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use event_store::EventStore;
use insights_analytics::{AnalyticsEngine, EngineConfig};
use worker::RetentionManager;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Query and ingestion facade
    pub engine: Arc<AnalyticsEngine>,
    /// Compliance purge, shared with the background scheduler
    pub retention: Arc<RetentionManager>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, config: EngineConfig) -> Self {
        let retention = Arc::new(RetentionManager::new(store.clone(), config.retention));
        Self::with_retention(store, config, retention)
    }

    /// Shares an existing retention manager, typically the scheduler's.
    pub fn with_retention(
        store: Arc<dyn EventStore>,
        config: EngineConfig,
        retention: Arc<RetentionManager>,
    ) -> Self {
        Self {
            engine: Arc::new(AnalyticsEngine::new(store, config)),
            retention,
            started_at: Utc::now(),
        }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        self.engine.store()
    }
}
