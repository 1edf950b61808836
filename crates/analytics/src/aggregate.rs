//! Customer and business aggregations.
//!
//! Every function here is a pure computation over events that already
//! match the caller's filter. Sparse optional fields are excluded from
//! averages rather than counted as zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use insights_core::{
    AnalyticsEvent, DateRange, EventCategory, EventType, Granularity, JourneyStep, Pagination,
};
use telemetry::HealthStatus;

/// Mean of the present values, `None` when there are none.
pub(crate) fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Percentage `part / whole * 100`, 0 when `whole` is 0.
pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Nearest-rank percentile over unsorted values.
fn percentile(values: &mut [f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = ((pct / 100.0) * values.len() as f64).ceil() as usize;
    Some(values[rank.clamp(1, values.len()) - 1])
}

fn most_frequent<'a, I: IntoIterator<Item = &'a str>>(values: I) -> Option<String> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    // BTreeMap iteration makes ties resolve alphabetically.
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, u64)>, (v, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((v, n)),
        })
        .map(|(v, _)| v.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOverview {
    pub total_events: u64,
    pub unique_sessions: u64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub active_event_types: u64,
    pub avg_engagement_score: f64,
}

/// Single-pass summary of a customer's activity.
pub fn customer_overview(events: &[AnalyticsEvent]) -> CustomerOverview {
    let sessions: HashSet<&str> = events.iter().filter_map(|e| e.session_id.as_deref()).collect();
    let types: HashSet<EventType> = events.iter().map(|e| e.event_type).collect();

    CustomerOverview {
        total_events: events.len() as u64,
        unique_sessions: sessions.len() as u64,
        first_seen: events.iter().map(|e| e.timestamp).min(),
        last_seen: events.iter().map(|e| e.timestamp).max(),
        active_event_types: types.len() as u64,
        avg_engagement_score: mean(events.iter().filter_map(|e| e.metrics.engagement_score))
            .unwrap_or(0.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorEntry {
    pub event_type: EventType,
    pub count: u64,
    pub avg_session_duration: Option<f64>,
    pub last_occurrence: DateTime<Utc>,
}

/// Per event type counts, most frequent first.
pub fn customer_behavior(events: &[AnalyticsEvent]) -> Vec<BehaviorEntry> {
    let mut groups: HashMap<EventType, Vec<&AnalyticsEvent>> = HashMap::new();
    for event in events {
        groups.entry(event.event_type).or_default().push(event);
    }

    let mut entries: Vec<BehaviorEntry> = groups
        .into_iter()
        .filter_map(|(event_type, group)| {
            let last_occurrence = group.iter().map(|e| e.timestamp).max()?;
            Some(BehaviorEntry {
                event_type,
                count: group.len() as u64,
                avg_session_duration: mean(group.iter().filter_map(|e| e.metrics.session_duration)),
                last_occurrence,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(b.last_occurrence.cmp(&a.last_occurrence))
            .then(a.event_type.cmp(&b.event_type))
    });
    entries
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSummary {
    pub avg_page_views: Option<f64>,
    pub avg_session_duration: Option<f64>,
    pub avg_scroll_depth: Option<f64>,
    pub total_clicks: u64,
}

pub fn engagement_metrics(events: &[AnalyticsEvent]) -> EngagementSummary {
    EngagementSummary {
        avg_page_views: mean(
            events
                .iter()
                .filter_map(|e| e.metrics.page_view_count.map(f64::from)),
        ),
        avg_session_duration: mean(events.iter().filter_map(|e| e.metrics.session_duration)),
        avg_scroll_depth: mean(events.iter().filter_map(|e| e.metrics.scroll_depth)),
        total_clicks: events
            .iter()
            .map(|e| u64::from(e.metrics.click_count.unwrap_or(0)))
            .sum(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPreferences {
    pub preferred_unit_size: Option<String>,
    pub preferred_price_range: Option<String>,
    pub preferred_facility: Option<String>,
    pub preferred_item_category: Option<String>,
    pub preferred_platform: Option<String>,
}

/// Most frequent value of each preference-bearing property.
pub fn customer_preferences(events: &[AnalyticsEvent]) -> CustomerPreferences {
    CustomerPreferences {
        preferred_unit_size: most_frequent(
            events.iter().filter_map(|e| e.properties.unit_size.as_deref()),
        ),
        preferred_price_range: most_frequent(
            events.iter().filter_map(|e| e.properties.price_range.as_deref()),
        ),
        preferred_facility: most_frequent(
            events.iter().filter_map(|e| e.properties.facility_id.as_deref()),
        ),
        preferred_item_category: most_frequent(
            events.iter().filter_map(|e| e.properties.item_category.as_deref()),
        ),
        preferred_platform: most_frequent(events.iter().filter_map(|e| e.platform()).map(|p| p.as_str())),
    }
}

/// Customer dashboard bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInsights {
    pub customer_id: String,
    pub date_range: DateRange,
    pub overview: CustomerOverview,
    pub behavior: Vec<BehaviorEntry>,
    pub engagement: EngagementSummary,
    pub preferences: CustomerPreferences,
    pub journey: Vec<JourneyStep>,
}

/// Builds the dashboard from one customer's events (newest first).
pub fn customer_insights(
    customer_id: &str,
    range: DateRange,
    events: &[AnalyticsEvent],
    journey_limit: usize,
) -> CustomerInsights {
    let mut journey: Vec<JourneyStep> = events
        .iter()
        .take(journey_limit)
        .map(AnalyticsEvent::journey_step)
        .collect();
    journey.reverse();

    CustomerInsights {
        customer_id: customer_id.to_string(),
        date_range: range,
        overview: customer_overview(events),
        behavior: customer_behavior(events),
        engagement: engagement_metrics(events),
        preferences: customer_preferences(events),
        journey,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub error_events: u64,
    /// Percentage of events in the window that are errors
    pub error_rate: f64,
    pub avg_response_time: Option<f64>,
    pub status: HealthStatus,
}

impl SystemHealth {
    fn from_events(events: &[AnalyticsEvent]) -> Self {
        let error_events = count_errors(events);
        let error_rate = percent(error_events, events.len() as u64);

        let status = if error_rate < 5.0 {
            HealthStatus::Healthy
        } else if error_rate < 20.0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        Self {
            error_events,
            error_rate,
            avg_response_time: mean(events.iter().filter_map(|e| e.properties.response_time)),
            status,
        }
    }
}

fn count_errors(events: &[AnalyticsEvent]) -> u64 {
    events
        .iter()
        .filter(|e| {
            e.event_category == EventCategory::ErrorEvent
                || e.event_type == EventType::ErrorOccurred
        })
        .count() as u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSnapshot {
    pub timestamp: DateTime<Utc>,
    pub window_minutes: i64,
    pub active_users: u64,
    pub current_events: u64,
    pub live_conversions: u64,
    pub system_health: SystemHealth,
}

/// Point-in-time activity over events already limited to the window.
pub fn realtime_snapshot(
    events: &[AnalyticsEvent],
    now: DateTime<Utc>,
    window_minutes: i64,
) -> RealtimeSnapshot {
    let users: HashSet<&str> = events.iter().map(|e| e.customer_id.as_str()).collect();

    RealtimeSnapshot {
        timestamp: now,
        window_minutes,
        active_users: users.len() as u64,
        current_events: events.len() as u64,
        live_conversions: events
            .iter()
            .filter(|e| e.properties.conversion_step.is_some())
            .count() as u64,
        system_health: SystemHealth::from_events(events),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessOverview {
    pub total_events: u64,
    pub unique_customers: u64,
    pub unique_sessions: u64,
    pub avg_engagement_score: f64,
    pub events_per_customer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    pub bucket_start: DateTime<Utc>,
    pub events: u64,
    pub unique_customers: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStat {
    pub stage: EventType,
    pub customers: u64,
    /// Share of the previous stage's customers (100 for the first stage)
    pub rate_from_previous: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionBreakdown {
    pub stages: Vec<StageStat>,
    /// Paying customers as a share of searching customers
    pub overall_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionCount {
    pub value: String,
    pub events: u64,
    pub customers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub by_customer_type: Vec<DimensionCount>,
    pub by_platform: Vec<DimensionCount>,
    pub by_country: Vec<DimensionCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    pub avg_load_time: Option<f64>,
    pub p95_load_time: Option<f64>,
    pub avg_response_time: Option<f64>,
    pub error_events: u64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueBucket {
    pub bucket_start: DateTime<Utc>,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
    pub total_revenue: f64,
    pub paying_customers: u64,
    pub avg_revenue_per_paying_customer: f64,
    pub by_bucket: Vec<RevenueBucket>,
}

/// Business-wide KPIs for one range and granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAnalytics {
    pub date_range: DateRange,
    pub granularity: Granularity,
    pub overview: BusinessOverview,
    pub trends: Vec<TrendBucket>,
    pub conversion: ConversionBreakdown,
    pub demographics: Demographics,
    pub performance: PerformanceStats,
    pub revenue: RevenueStats,
}

const COMMERCE_STAGES: [EventType; 4] = [
    EventType::StorageSearch,
    EventType::UnitView,
    EventType::UnitBooking,
    EventType::PaymentCompleted,
];

fn business_overview(events: &[AnalyticsEvent]) -> BusinessOverview {
    let customers: HashSet<&str> = events.iter().map(|e| e.customer_id.as_str()).collect();
    let sessions: HashSet<&str> = events.iter().filter_map(|e| e.session_id.as_deref()).collect();

    BusinessOverview {
        total_events: events.len() as u64,
        unique_customers: customers.len() as u64,
        unique_sessions: sessions.len() as u64,
        avg_engagement_score: mean(events.iter().filter_map(|e| e.metrics.engagement_score))
            .unwrap_or(0.0),
        events_per_customer: if customers.is_empty() {
            0.0
        } else {
            events.len() as f64 / customers.len() as f64
        },
    }
}

fn trends(events: &[AnalyticsEvent], granularity: Granularity) -> Vec<TrendBucket> {
    let mut buckets: BTreeMap<DateTime<Utc>, (u64, HashSet<&str>, f64)> = BTreeMap::new();
    for event in events {
        let entry = buckets
            .entry(granularity.truncate(event.timestamp))
            .or_insert_with(|| (0, HashSet::new(), 0.0));
        entry.0 += 1;
        entry.1.insert(event.customer_id.as_str());
        entry.2 += event.positive_revenue().unwrap_or(0.0);
    }

    buckets
        .into_iter()
        .map(|(bucket_start, (events, customers, revenue))| TrendBucket {
            bucket_start,
            events,
            unique_customers: customers.len() as u64,
            revenue,
        })
        .collect()
}

fn conversion(events: &[AnalyticsEvent]) -> ConversionBreakdown {
    let mut per_stage: HashMap<EventType, HashSet<&str>> = HashMap::new();
    for event in events {
        if COMMERCE_STAGES.contains(&event.event_type) {
            per_stage
                .entry(event.event_type)
                .or_default()
                .insert(event.customer_id.as_str());
        }
    }

    let counts: Vec<u64> = COMMERCE_STAGES
        .iter()
        .map(|stage| per_stage.get(stage).map_or(0, |s| s.len() as u64))
        .collect();

    let stages = COMMERCE_STAGES
        .iter()
        .zip(&counts)
        .enumerate()
        .map(|(i, (stage, &customers))| StageStat {
            stage: *stage,
            customers,
            rate_from_previous: if i == 0 {
                if customers > 0 { 100.0 } else { 0.0 }
            } else {
                percent(customers, counts[i - 1])
            },
        })
        .collect();

    ConversionBreakdown {
        stages,
        overall_rate: percent(counts[3], counts[0]),
    }
}

fn dimension<'a, F>(events: &'a [AnalyticsEvent], key: F) -> Vec<DimensionCount>
where
    F: Fn(&'a AnalyticsEvent) -> Option<&'a str>,
{
    let mut groups: HashMap<&str, (u64, HashSet<&str>)> = HashMap::new();
    for event in events {
        if let Some(value) = key(event) {
            let entry = groups.entry(value).or_default();
            entry.0 += 1;
            entry.1.insert(event.customer_id.as_str());
        }
    }

    let mut counts: Vec<DimensionCount> = groups
        .into_iter()
        .map(|(value, (events, customers))| DimensionCount {
            value: value.to_string(),
            events,
            customers: customers.len() as u64,
        })
        .collect();
    counts.sort_by(|a, b| b.events.cmp(&a.events).then(a.value.cmp(&b.value)));
    counts
}

fn demographics(events: &[AnalyticsEvent]) -> Demographics {
    Demographics {
        by_customer_type: dimension(events, |e| Some(e.customer_type.as_str())),
        by_platform: dimension(events, |e| e.platform().map(|p| p.as_str())),
        by_country: dimension(events, |e| e.country()),
    }
}

fn performance(events: &[AnalyticsEvent]) -> PerformanceStats {
    let mut load_times: Vec<f64> = events.iter().filter_map(|e| e.properties.load_time).collect();
    let error_events = count_errors(events);

    PerformanceStats {
        avg_load_time: mean(load_times.iter().copied()),
        p95_load_time: percentile(&mut load_times, 95.0),
        avg_response_time: mean(events.iter().filter_map(|e| e.properties.response_time)),
        error_events,
        error_rate: percent(error_events, events.len() as u64),
    }
}

fn revenue(events: &[AnalyticsEvent], granularity: Granularity) -> RevenueStats {
    let mut per_customer: HashMap<&str, f64> = HashMap::new();
    let mut per_bucket: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();

    for event in events {
        if let Some(amount) = event.positive_revenue() {
            *per_customer.entry(event.customer_id.as_str()).or_default() += amount;
            *per_bucket.entry(granularity.truncate(event.timestamp)).or_default() += amount;
        }
    }

    let total_revenue: f64 = per_customer.values().sum();
    let paying_customers = per_customer.len() as u64;

    RevenueStats {
        total_revenue,
        paying_customers,
        avg_revenue_per_paying_customer: if paying_customers == 0 {
            0.0
        } else {
            total_revenue / paying_customers as f64
        },
        by_bucket: per_bucket
            .into_iter()
            .map(|(bucket_start, revenue)| RevenueBucket { bucket_start, revenue })
            .collect(),
    }
}

pub fn business_analytics(
    events: &[AnalyticsEvent],
    range: DateRange,
    granularity: Granularity,
) -> BusinessAnalytics {
    BusinessAnalytics {
        date_range: range,
        granularity,
        overview: business_overview(events),
        trends: trends(events, granularity),
        conversion: conversion(events),
        demographics: demographics(events),
        performance: performance(events),
        revenue: revenue(events, granularity),
    }
}

/// Business analytics over a trailing period plus the current real-time view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub period: String,
    pub business: BusinessAnalytics,
    pub realtime: RealtimeSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    pub total_count: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub events: Vec<AnalyticsEvent>,
    pub pagination: PageInfo,
}

/// Slices an ordered result set into one page.
pub fn paginate(events: Vec<AnalyticsEvent>, pagination: Pagination) -> EventPage {
    let total_count = events.len() as u64;
    let events = events
        .into_iter()
        .skip(pagination.offset())
        .take(pagination.limit)
        .collect();

    EventPage {
        events,
        pagination: PageInfo {
            page: pagination.page,
            limit: pagination.limit,
            total_count,
            total_pages: pagination.total_pages(total_count),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use insights_core::{
        validate_and_enrich, Device, EngagementMetrics, EventInput, EventProperties, Location,
        Platform,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
    }

    fn event(customer: &str, event_type: &str, mins: i64) -> AnalyticsEvent {
        let input = EventInput {
            customer_id: Some(customer.into()),
            event_type: Some(event_type.into()),
            timestamp: Some(t0() + Duration::minutes(mins)),
            ..EventInput::default()
        };
        validate_and_enrich(input, t0()).unwrap()
    }

    #[test]
    fn test_empty_overview_is_zeroed() {
        let overview = customer_overview(&[]);
        assert_eq!(overview.total_events, 0);
        assert_eq!(overview.unique_sessions, 0);
        assert_eq!(overview.active_event_types, 0);
        assert_eq!(overview.avg_engagement_score, 0.0);
        assert!(overview.first_seen.is_none());
        assert!(overview.last_seen.is_none());

        let engagement = engagement_metrics(&[]);
        assert!(engagement.avg_page_views.is_none());
        assert_eq!(engagement.total_clicks, 0);
    }

    #[test]
    fn test_overview_excludes_missing_engagement_scores() {
        let mut a = event("c1", "PAGE_VIEW", 0);
        a.metrics.engagement_score = Some(80.0);
        a.session_id = Some("s1".into());
        let mut b = event("c1", "UNIT_VIEW", 30);
        b.session_id = Some("s1".into());
        let mut c = event("c1", "UNIT_VIEW", 60);
        c.metrics.engagement_score = Some(40.0);
        c.session_id = Some("s2".into());

        let overview = customer_overview(&[a, b, c]);
        assert_eq!(overview.total_events, 3);
        assert_eq!(overview.unique_sessions, 2);
        assert_eq!(overview.active_event_types, 2);
        assert_eq!(overview.avg_engagement_score, 60.0);
        assert_eq!(overview.first_seen, Some(t0()));
        assert_eq!(overview.last_seen, Some(t0() + Duration::minutes(60)));
    }

    #[test]
    fn test_behavior_sorted_by_count_then_recency() {
        let events = vec![
            event("c1", "PAGE_VIEW", 0),
            event("c1", "PAGE_VIEW", 10),
            event("c1", "UNIT_VIEW", 20),
            event("c1", "STORAGE_SEARCH", 5),
        ];
        let behavior = customer_behavior(&events);
        assert_eq!(behavior[0].event_type, EventType::PageView);
        assert_eq!(behavior[0].count, 2);
        // tie on count: UNIT_VIEW happened later
        assert_eq!(behavior[1].event_type, EventType::UnitView);
        assert_eq!(behavior[2].event_type, EventType::StorageSearch);
    }

    #[test]
    fn test_engagement_ignores_missing_fields() {
        let mut a = event("c1", "PAGE_VIEW", 0);
        a.metrics = EngagementMetrics {
            page_view_count: Some(4),
            click_count: Some(3),
            scroll_depth: Some(50.0),
            ..EngagementMetrics::default()
        };
        let mut b = event("c1", "PAGE_VIEW", 1);
        b.metrics.page_view_count = Some(2);
        let c = event("c1", "PAGE_VIEW", 2);

        let summary = engagement_metrics(&[a, b, c]);
        assert_eq!(summary.avg_page_views, Some(3.0));
        assert_eq!(summary.avg_scroll_depth, Some(50.0));
        assert!(summary.avg_session_duration.is_none());
        assert_eq!(summary.total_clicks, 3);
    }

    #[test]
    fn test_preferences_pick_most_frequent() {
        let mut events = Vec::new();
        for (i, size) in ["10x10", "5x5", "10x10"].iter().enumerate() {
            let mut e = event("c1", "UNIT_VIEW", i as i64);
            e.properties = EventProperties {
                unit_size: Some(size.to_string()),
                ..EventProperties::default()
            };
            e.device = Some(Device {
                platform: Some(Platform::Mobile),
                ..Device::default()
            });
            events.push(e);
        }
        let prefs = customer_preferences(&events);
        assert_eq!(prefs.preferred_unit_size.as_deref(), Some("10x10"));
        assert_eq!(prefs.preferred_platform.as_deref(), Some("Mobile"));
        assert!(prefs.preferred_facility.is_none());
    }

    #[test]
    fn test_realtime_health_thresholds() {
        let mut events: Vec<AnalyticsEvent> =
            (0..9).map(|i| event(&format!("c{}", i % 3), "PAGE_VIEW", i)).collect();
        events.push(event("c9", "ERROR_OCCURRED", 10));
        events[0].properties.conversion_step = Some("search".into());

        let snapshot = realtime_snapshot(&events, t0(), 60);
        assert_eq!(snapshot.active_users, 4);
        assert_eq!(snapshot.current_events, 10);
        assert_eq!(snapshot.live_conversions, 1);
        assert_eq!(snapshot.system_health.error_events, 1);
        assert_eq!(snapshot.system_health.error_rate, 10.0);
        assert_eq!(snapshot.system_health.status, HealthStatus::Degraded);

        let quiet = realtime_snapshot(&[], t0(), 60);
        assert_eq!(quiet.system_health.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_business_analytics_sections() {
        let mut booking = event("c1", "UNIT_BOOKING", 0);
        booking.properties.revenue = Some(300.0);
        booking.properties.load_time = Some(200.0);
        booking.location = Some(Location {
            country: Some("US".into()),
            ..Location::default()
        });
        let mut payment = event("c2", "PAYMENT_COMPLETED", 60 * 24 * 8);
        payment.properties.revenue = Some(100.0);
        payment.properties.load_time = Some(400.0);

        let events = vec![
            event("c1", "STORAGE_SEARCH", 0),
            event("c2", "STORAGE_SEARCH", 1),
            event("c1", "UNIT_VIEW", 2),
            booking,
            payment,
        ];
        let range = DateRange::new(t0(), t0() + Duration::days(30)).unwrap();
        let report = business_analytics(&events, range, Granularity::Weekly);

        assert_eq!(report.overview.total_events, 5);
        assert_eq!(report.overview.unique_customers, 2);
        assert_eq!(report.overview.events_per_customer, 2.5);

        // 2024-03-04 is a Monday
        assert_eq!(report.trends.len(), 2);
        assert_eq!(report.trends[0].bucket_start, t0() - Duration::hours(10));
        assert_eq!(report.trends[0].events, 4);

        let stages = &report.conversion.stages;
        assert_eq!(stages[0].customers, 2);
        assert_eq!(stages[1].rate_from_previous, 50.0);
        assert_eq!(report.conversion.overall_rate, 50.0);

        assert_eq!(report.demographics.by_country.len(), 1);
        assert_eq!(report.demographics.by_customer_type[0].events, 5);

        assert_eq!(report.performance.avg_load_time, Some(300.0));
        assert_eq!(report.performance.p95_load_time, Some(400.0));

        assert_eq!(report.revenue.total_revenue, 400.0);
        assert_eq!(report.revenue.paying_customers, 2);
        assert_eq!(report.revenue.avg_revenue_per_paying_customer, 200.0);
        assert_eq!(report.revenue.by_bucket.len(), 2);
    }

    #[test]
    fn test_paginate() {
        let events: Vec<AnalyticsEvent> = (0..7).map(|i| event("c1", "PAGE_VIEW", i)).collect();
        let page = paginate(events, Pagination::new(Some(2), Some(3)).unwrap());
        assert_eq!(page.events.len(), 3);
        assert_eq!(page.pagination.total_count, 7);
        assert_eq!(page.pagination.total_pages, 3);
    }
}
