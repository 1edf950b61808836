//! Deadline-enforcing facade over the store and the pure aggregations.

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use event_store::EventStore;
use insights_core::limits::{DEFAULT_PAGE_LIMIT, DEFAULT_REALTIME_WINDOW_MINUTES, MAX_REALTIME_WINDOW_MINUTES};
use insights_core::{
    schema::validate_and_enrich_with, DateRange, Error, EventFilter, EventInput, Granularity,
    JourneyStep, Pagination, Result, RetentionPolicy, Segments, SortOrder,
};
use telemetry::{metrics, Gauge};

use crate::aggregate::{self, *};
use crate::cohort::{self, CohortReport, CohortRequest};
use crate::funnel::{self, FunnelReport};
use crate::predict::{self, PredictiveInsights};

/// Holds one slot of an in-flight gauge until dropped, including when the
/// query future is cancelled mid-await.
struct InFlight<'a>(&'a Gauge);

impl<'a> InFlight<'a> {
    fn enter(gauge: &'a Gauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Default per-query deadline.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Deadline applied when a caller does not pass one
    pub query_timeout: Duration,
    pub retention: RetentionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            retention: RetentionPolicy::default(),
        }
    }
}

/// Acknowledgement returned to the ingestion caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEvent {
    pub event_id: String,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Entry point for every read and write against the event store.
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn EventStore>,
    config: EngineConfig,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn EventStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `fut` under the deadline, recording latency and outcome.
    async fn run<T, F>(&self, operation: &'static str, deadline: Option<Duration>, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = deadline.unwrap_or(self.config.query_timeout);
        let m = metrics();
        let in_flight = InFlight::enter(&m.in_flight_queries);
        let start = Instant::now();

        let result = match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                m.query_timeouts.inc();
                warn!(operation, timeout_ms = timeout.as_millis() as u64, "Query deadline exceeded");
                Err(Error::QueryTimeout {
                    operation,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };

        drop(in_flight);
        let elapsed = start.elapsed().as_millis() as u64;
        m.query_latency_ms.observe(elapsed);
        match result {
            Ok(_) => {
                m.queries_served.inc();
                debug!(operation, latency_ms = elapsed, "Query served");
            }
            Err(ref e) => {
                m.query_errors.inc();
                debug!(operation, error = %e, "Query failed");
            }
        }
        result
    }

    /// Validates, enriches and appends one event.
    pub async fn track_event(&self, input: EventInput) -> Result<TrackedEvent> {
        let m = metrics();
        m.events_received.inc();
        let start = Instant::now();

        let event = match validate_and_enrich_with(input, Utc::now(), &self.config.retention) {
            Ok(event) => event,
            Err(e) => {
                m.events_rejected.inc();
                return Err(e);
            }
        };
        let timestamp = event.timestamp;
        let customer_id = event.customer_id.clone();
        let event_type = event.event_type;

        let event_id = match self.store.append(event).await {
            Ok(id) => id,
            Err(e) => {
                if matches!(e, Error::DuplicateEventId(_)) {
                    m.duplicate_events.inc();
                }
                m.events_rejected.inc();
                return Err(e);
            }
        };

        m.events_tracked.inc();
        m.ingest_latency_ms.observe_duration(start.elapsed());
        debug!(%event_id, %customer_id, %event_type, "Event tracked");

        Ok(TrackedEvent { event_id, timestamp })
    }

    async fn customer_events(&self, customer_id: &str, range: DateRange) -> Result<Vec<insights_core::AnalyticsEvent>> {
        self.store.query_by_customer(customer_id, Some(range)).await
    }

    pub async fn customer_overview(
        &self,
        customer_id: &str,
        range: DateRange,
        deadline: Option<Duration>,
    ) -> Result<CustomerOverview> {
        self.run("customer_overview", deadline, async {
            let events = self.customer_events(customer_id, range).await?;
            Ok(aggregate::customer_overview(&events))
        })
        .await
    }

    pub async fn customer_behavior(
        &self,
        customer_id: &str,
        range: DateRange,
        deadline: Option<Duration>,
    ) -> Result<Vec<BehaviorEntry>> {
        self.run("customer_behavior", deadline, async {
            let events = self.customer_events(customer_id, range).await?;
            Ok(aggregate::customer_behavior(&events))
        })
        .await
    }

    pub async fn engagement_metrics(
        &self,
        customer_id: &str,
        range: DateRange,
        deadline: Option<Duration>,
    ) -> Result<EngagementSummary> {
        self.run("engagement_metrics", deadline, async {
            let events = self.customer_events(customer_id, range).await?;
            Ok(aggregate::engagement_metrics(&events))
        })
        .await
    }

    pub async fn customer_preferences(
        &self,
        customer_id: &str,
        range: DateRange,
        deadline: Option<Duration>,
    ) -> Result<CustomerPreferences> {
        self.run("customer_preferences", deadline, async {
            let events = self.customer_events(customer_id, range).await?;
            Ok(aggregate::customer_preferences(&events))
        })
        .await
    }

    /// Customer dashboard: one store read feeds every section.
    pub async fn customer_insights(
        &self,
        customer_id: &str,
        range: DateRange,
        deadline: Option<Duration>,
    ) -> Result<CustomerInsights> {
        self.run("customer_insights", deadline, async {
            let events = self.customer_events(customer_id, range).await?;
            Ok(aggregate::customer_insights(
                customer_id,
                range,
                &events,
                DEFAULT_PAGE_LIMIT,
            ))
        })
        .await
    }

    /// Oldest-first journey, capped at `limit` steps.
    pub async fn journey(
        &self,
        customer_id: &str,
        session_id: Option<&str>,
        limit: usize,
        deadline: Option<Duration>,
    ) -> Result<Vec<JourneyStep>> {
        let limit = Pagination::new(None, Some(limit))?.limit;
        self.run("journey", deadline, async {
            let mut steps = self.store.query_journey(customer_id, session_id).await?;
            steps.truncate(limit);
            Ok(steps)
        })
        .await
    }

    pub async fn realtime_snapshot(
        &self,
        window_minutes: Option<i64>,
        deadline: Option<Duration>,
    ) -> Result<RealtimeSnapshot> {
        let window = window_minutes.unwrap_or(DEFAULT_REALTIME_WINDOW_MINUTES);
        if !(1..=MAX_REALTIME_WINDOW_MINUTES).contains(&window) {
            return Err(Error::invalid_parameter(
                "windowMinutes",
                format!("must be between 1 and {}", MAX_REALTIME_WINDOW_MINUTES),
            ));
        }

        self.run("realtime_snapshot", deadline, self.realtime_inner(window))
            .await
    }

    async fn realtime_inner(&self, window: i64) -> Result<RealtimeSnapshot> {
        let now = Utc::now();
        let range = DateRange::new(now - ChronoDuration::minutes(window), now)?;
        let events = self.store.find(&EventFilter::all().with_range(range)).await?;
        Ok(aggregate::realtime_snapshot(&events, now, window))
    }

    pub async fn business_analytics(
        &self,
        range: DateRange,
        granularity: Granularity,
        segments: Segments,
        deadline: Option<Duration>,
    ) -> Result<BusinessAnalytics> {
        self.run(
            "business_analytics",
            deadline,
            self.business_inner(range, granularity, segments),
        )
        .await
    }

    async fn business_inner(
        &self,
        range: DateRange,
        granularity: Granularity,
        segments: Segments,
    ) -> Result<BusinessAnalytics> {
        let filter = EventFilter::all().with_range(range).with_segments(segments);
        let events = self.store.find(&filter).await?;
        Ok(aggregate::business_analytics(&events, range, granularity))
    }

    /// Business analytics over the last `period_days` plus a real-time view.
    pub async fn analytics_summary(
        &self,
        period_days: u32,
        deadline: Option<Duration>,
    ) -> Result<AnalyticsSummary> {
        self.run("analytics_summary", deadline, async {
            let range = DateRange::last_days(Utc::now(), period_days);
            let business = self
                .business_inner(range, Granularity::Daily, Segments::none())
                .await?;
            let realtime = self.realtime_inner(DEFAULT_REALTIME_WINDOW_MINUTES).await?;
            Ok(AnalyticsSummary {
                period: format!("{}d", period_days),
                business,
                realtime,
            })
        })
        .await
    }

    /// Paginated event listing.
    pub async fn list_events(
        &self,
        filter: EventFilter,
        pagination: Pagination,
        order: SortOrder,
        deadline: Option<Duration>,
    ) -> Result<EventPage> {
        self.run("list_events", deadline, async {
            let mut events = self.store.find(&filter).await?;
            if order == SortOrder::Asc {
                events.reverse();
            }
            Ok(aggregate::paginate(events, pagination))
        })
        .await
    }

    pub async fn analyze_funnel(
        &self,
        steps: &[String],
        range: DateRange,
        segments: Segments,
        deadline: Option<Duration>,
    ) -> Result<FunnelReport> {
        let steps = funnel::validate_steps(steps)?;
        self.run("funnel", deadline, async {
            let filter = EventFilter::all().with_range(range).with_segments(segments);
            let events = self.store.find(&filter).await?;
            Ok(funnel::analyze_funnel(&steps, &events))
        })
        .await
    }

    pub async fn analyze_cohorts(
        &self,
        request: CohortRequest,
        deadline: Option<Duration>,
    ) -> Result<CohortReport> {
        self.run("cohort", deadline, async {
            let now = Utc::now();
            // Full history so customers acquired before the start date are recognized
            let events = self.store.find(&EventFilter::all()).await?;
            Ok(cohort::analyze_cohorts(&request, &events, now))
        })
        .await
    }

    pub async fn predictive_insights(
        &self,
        customer_id: &str,
        deadline: Option<Duration>,
    ) -> Result<PredictiveInsights> {
        self.run("predictions", deadline, async {
            let events = self.store.query_by_customer(customer_id, None).await?;
            Ok(predict::predictive_insights(customer_id, &events, Utc::now()))
        })
        .await
    }
}
