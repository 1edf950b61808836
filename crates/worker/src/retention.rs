//! Retention manager for compliance deletion.
//!
//! Every event carries its own `privacy.dataRetentionExpiry`. Purging
//! removes events whose expiry is strictly before the purge instant, in
//! bounded batches so a large backlog never blocks the store for long.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use event_store::EventStore;
use insights_core::{Result, RetentionPolicy};
use telemetry::metrics;

/// Outcome of one purge run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub deleted_count: u64,
    pub batches: u32,
    pub as_of: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Deletes expired events from a store.
pub struct RetentionManager {
    store: Arc<dyn EventStore>,
    policy: RetentionPolicy,
}

impl RetentionManager {
    pub fn new(store: Arc<dyn EventStore>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Purges every event that expired before `as_of`.
    ///
    /// Idempotent: a second run at the same instant deletes nothing.
    pub async fn purge_expired(&self, as_of: DateTime<Utc>) -> Result<PurgeReport> {
        let start = Instant::now();
        let batch_size = self.policy.purge_batch_size.max(1);
        let mut deleted_count = 0u64;
        let mut batches = 0u32;

        loop {
            let deleted = match self.store.delete_expired_batch(as_of, batch_size).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(
                        backend = self.store.backend(),
                        deleted_so_far = deleted_count,
                        error = %e,
                        "Purge aborted"
                    );
                    return Err(e);
                }
            };
            batches += 1;
            deleted_count += deleted;
            debug!(batch = batches, deleted, "Purge batch complete");

            if deleted < batch_size as u64 {
                break;
            }
            tokio::task::yield_now().await;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let m = metrics();
        m.purge_runs.inc();
        m.events_purged.inc_by(deleted_count);
        m.purge_latency_ms.observe(duration_ms);

        info!(
            backend = self.store.backend(),
            deleted_count,
            batches,
            as_of = %as_of,
            duration_ms,
            "Expired events purged"
        );

        Ok(PurgeReport {
            deleted_count,
            batches,
            as_of,
            duration_ms,
        })
    }
}
