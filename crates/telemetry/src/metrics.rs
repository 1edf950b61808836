//! In-process metrics.
//!
//! Lock-free counters and latency histograms, read back through
//! `Metrics::snapshot` by the health endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Up/down gauge that never wraps below zero.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Upper bounds (ms) of the latency buckets. One extra overflow slot follows.
const LATENCY_BOUNDS_MS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1_000, 5_000, 10_000];

/// Fixed-bucket latency histogram in milliseconds.
#[derive(Debug, Default)]
pub struct Histogram {
    buckets: [AtomicU64; LATENCY_BOUNDS_MS.len() + 1],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, ms: u64) {
        let slot = LATENCY_BOUNDS_MS.partition_point(|&bound| bound < ms);
        self.buckets[slot].fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_duration(&self, elapsed: Duration) {
        self.observe(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum() as f64 / n as f64,
        }
    }

    /// Upper bound of the bucket holding quantile `q`.
    ///
    /// Observations past the last bound report that bound.
    pub fn quantile(&self, q: f64) -> u64 {
        let total = self.count();
        if total == 0 {
            return 0;
        }
        let rank = ((q.clamp(0.0, 1.0) * total as f64).ceil() as u64).max(1);
        let mut seen = 0;
        for (slot, bucket) in self.buckets.iter().enumerate() {
            seen += bucket.load(Ordering::Relaxed);
            if seen >= rank {
                return LATENCY_BOUNDS_MS[slot.min(LATENCY_BOUNDS_MS.len() - 1)];
            }
        }
        LATENCY_BOUNDS_MS[LATENCY_BOUNDS_MS.len() - 1]
    }

    /// `(upper bound, count)` per bucket; the overflow slot reports `u64::MAX`.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        LATENCY_BOUNDS_MS
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the insights engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Write path
    pub events_received: Counter,
    pub events_tracked: Counter,
    pub events_rejected: Counter,
    pub duplicate_events: Counter,

    // Read path
    pub queries_served: Counter,
    pub query_errors: Counter,
    pub query_timeouts: Counter,

    // Store
    pub store_errors: Counter,

    // Retention
    pub purge_runs: Counter,
    pub events_purged: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub query_latency_ms: Histogram,
    pub purge_latency_ms: Histogram,

    // Gauges
    pub in_flight_queries: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_received: u64,
    pub events_tracked: u64,
    pub events_rejected: u64,
    pub duplicate_events: u64,
    pub queries_served: u64,
    pub query_errors: u64,
    pub query_timeouts: u64,
    pub store_errors: u64,
    pub purge_runs: u64,
    pub events_purged: u64,
    pub ingest_latency_mean_ms: f64,
    pub query_latency_mean_ms: f64,
    pub query_latency_p95_ms: u64,
    pub purge_latency_mean_ms: f64,
    pub in_flight_queries: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_received: self.events_received.get(),
            events_tracked: self.events_tracked.get(),
            events_rejected: self.events_rejected.get(),
            duplicate_events: self.duplicate_events.get(),
            queries_served: self.queries_served.get(),
            query_errors: self.query_errors.get(),
            query_timeouts: self.query_timeouts.get(),
            store_errors: self.store_errors.get(),
            purge_runs: self.purge_runs.get(),
            events_purged: self.events_purged.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            query_latency_mean_ms: self.query_latency_ms.mean(),
            query_latency_p95_ms: self.query_latency_ms.quantile(0.95),
            purge_latency_mean_ms: self.purge_latency_ms.mean(),
            in_flight_queries: self.in_flight_queries.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
