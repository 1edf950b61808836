//! Worker scheduler for background tasks.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use event_store::EventStore;
use insights_core::Result;
use telemetry::health;

use crate::retention::RetentionManager;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Retention purge interval
    pub retention_interval: Duration,
    /// Store health probe interval
    pub health_check_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retention_interval: Duration::from_secs(3600),  // 1 hour
            health_check_interval: Duration::from_secs(15), // 15 seconds
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<dyn EventStore>,
    retention: Arc<RetentionManager>,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn EventStore>,
        retention: Arc<RetentionManager>,
    ) -> Self {
        Self {
            config,
            store,
            retention,
        }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_retention_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_health_probe().await;
        }));

        info!(
            retention_interval_secs = self.config.retention_interval.as_secs(),
            "Background workers started"
        );
        handles
    }

    async fn run_retention_worker(&self) {
        let mut ticker = interval(self.config.retention_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.retention.purge_expired(Utc::now()).await {
                error!("Retention worker error: {}", e);
            }
        }
    }

    async fn run_health_probe(&self) {
        let mut ticker = interval(self.config.health_check_interval);

        loop {
            ticker.tick().await;
            let _ = probe_store(self.store.as_ref()).await;
        }
    }
}

/// Pings the store and refreshes the shared health registry.
///
/// Returns the record count observed by this probe.
pub async fn probe_store(store: &dyn EventStore) -> Result<u64> {
    let registry = health();
    let result = async {
        store.ping().await?;
        store.count_all().await
    }
    .await;

    match result {
        Ok(count) => {
            registry.store.set_healthy();
            registry.set_record_count(count);
            Ok(count)
        }
        Err(e) => {
            warn!(backend = store.backend(), error = %e, "Store health probe failed");
            registry.store.set_unhealthy(e.to_string());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::MemoryStore;

    #[tokio::test]
    async fn test_probe_marks_memory_store_healthy() {
        let store = MemoryStore::new();
        assert_eq!(probe_store(&store).await.unwrap(), 0);
        assert!(health().store.is_healthy());
        assert!(health().is_ready());
    }
}
