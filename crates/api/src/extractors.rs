//! Request extractors and query-string parsing.
//!
//! Query values arrive as raw strings so malformed input surfaces as a
//! coded `QUERY_004` error instead of a bare extractor rejection.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use insights_core::{
    limits::DEFAULT_PAGE_LIMIT, parse_period, parse_timestamp, DateRange, Error, EventFilter,
    EventType, Granularity, Pagination, Result, Segments, SortOrder,
};
use insights_analytics::CohortRequest;

use crate::response::ApiError;

/// Header carrying a per-request query deadline in milliseconds.
pub const DEADLINE_HEADER: &str = "x-query-timeout-ms";

/// Optional caller-supplied deadline; the engine default applies when absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(pub Option<Duration>);

#[async_trait]
impl<S> FromRequestParts<S> for Deadline
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(DEADLINE_HEADER) else {
            return Ok(Deadline(None));
        };

        let ms = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                Error::invalid_parameter("deadline", format!("{} must be a positive integer", DEADLINE_HEADER))
            })?;

        Ok(Deadline(Some(Duration::from_millis(ms))))
    }
}

fn parse_number<T: FromStr>(name: &'static str, raw: Option<&str>) -> Result<Option<T>> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| Error::invalid_parameter(name, format!("'{}' is not a number", v)))
        })
        .transpose()
}

fn parse_range(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateRange> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => DateRange::parse_param(raw, now),
        None => Ok(DateRange::default_ending(now)),
    }
}

fn parse_segments(raw: Option<&str>) -> Result<Segments> {
    raw.map(Segments::parse).unwrap_or_else(|| Ok(Segments::none()))
}

/// `GET /events`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    pub customer_id: Option<String>,
    pub event_type: Option<String>,
    pub date_range: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_order: Option<String>,
}

impl ListEventsQuery {
    pub fn parse(&self, now: DateTime<Utc>) -> Result<(EventFilter, Pagination, SortOrder)> {
        let mut filter = EventFilter::all();
        if let Some(customer_id) = self.customer_id.as_deref().filter(|c| !c.trim().is_empty()) {
            filter = EventFilter::for_customer(customer_id.trim());
        }
        if let Some(raw) = self.event_type.as_deref() {
            filter = filter.with_event_type(raw.parse::<EventType>()?);
        }
        if let Some(raw) = self.date_range.as_deref() {
            filter = filter.with_range(DateRange::parse_param(raw, now)?);
        }

        let pagination = Pagination::new(
            parse_number("page", self.page.as_deref())?,
            parse_number("limit", self.limit.as_deref())?,
        )?;
        let order = self
            .sort_order
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();

        Ok((filter, pagination, order))
    }
}

/// `GET /customers/:id/insights`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsQuery {
    pub date_range: Option<String>,
}

impl InsightsQuery {
    pub fn range(&self, now: DateTime<Utc>) -> Result<DateRange> {
        parse_range(self.date_range.as_deref(), now)
    }
}

/// `GET /customers/:id/journey`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyQuery {
    pub session_id: Option<String>,
    pub limit: Option<String>,
}

impl JourneyQuery {
    pub fn limit(&self) -> Result<usize> {
        Ok(parse_number("limit", self.limit.as_deref())?.unwrap_or(DEFAULT_PAGE_LIMIT))
    }
}

/// `GET /business/dashboard`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub date_range: Option<String>,
    pub granularity: Option<String>,
    pub segments: Option<String>,
}

impl DashboardQuery {
    pub fn parse(&self, now: DateTime<Utc>) -> Result<(DateRange, Granularity, Segments)> {
        let range = parse_range(self.date_range.as_deref(), now)?;
        let granularity = self
            .granularity
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();
        Ok((range, granularity, parse_segments(self.segments.as_deref())?))
    }
}

/// `GET /business/realtime`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeQuery {
    pub window_minutes: Option<String>,
}

impl RealtimeQuery {
    pub fn window(&self) -> Result<Option<i64>> {
        parse_number("windowMinutes", self.window_minutes.as_deref())
    }
}

/// `GET /business/summary`
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<String>,
}

impl SummaryQuery {
    pub fn days(&self) -> Result<u32> {
        parse_period(self.period.as_deref().unwrap_or("30d"))
    }
}

/// `GET /funnel`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelQuery {
    pub steps: Option<String>,
    pub date_range: Option<String>,
    pub segments: Option<String>,
}

impl FunnelQuery {
    pub fn parse(&self, now: DateTime<Utc>) -> Result<(Vec<String>, DateRange, Segments)> {
        let steps = self
            .steps
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::invalid_funnel("steps are required"))?
            .split(',')
            .map(str::to_string)
            .collect();
        let range = parse_range(self.date_range.as_deref(), now)?;
        Ok((steps, range, parse_segments(self.segments.as_deref())?))
    }
}

/// `GET /cohort`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortQuery {
    pub cohort_type: Option<String>,
    pub retention_periods: Option<String>,
    pub start_date: Option<String>,
}

impl CohortQuery {
    pub fn parse(&self, now: DateTime<Utc>) -> Result<CohortRequest> {
        let cohort_type = self
            .cohort_type
            .as_deref()
            .map(Granularity::parse_cohort_type)
            .transpose()?;

        let periods = self
            .retention_periods
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| {
                        p.parse::<u32>().map_err(|_| {
                            Error::invalid_parameter(
                                "retentionPeriods",
                                format!("'{}' is not a period", p),
                            )
                        })
                    })
                    .collect::<Result<Vec<u32>>>()
            })
            .transpose()?;

        let start_date = self
            .start_date
            .as_deref()
            .map(|raw| {
                parse_timestamp(raw.trim(), false)
                    .map_err(|_| Error::invalid_parameter("startDate", format!("unparseable date '{}'", raw)))
            })
            .transpose()?;

        CohortRequest::new(cohort_type, periods, start_date, now)
    }
}
