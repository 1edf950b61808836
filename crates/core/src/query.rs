//! Query parameter types shared by the store and the analytics engine.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::events::AnalyticsEvent;
use crate::limits::{DEFAULT_PAGE_LIMIT, DEFAULT_RANGE_DAYS, MAX_PAGE_LIMIT};

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range, rejecting `from > to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// The trailing `DEFAULT_RANGE_DAYS` ending at `now`.
    pub fn default_ending(now: DateTime<Utc>) -> Self {
        Self {
            from: now - Duration::days(DEFAULT_RANGE_DAYS),
            to: now,
        }
    }

    /// The trailing `days` ending at `now`.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            from: now - Duration::days(i64::from(days)),
            to: now,
        }
    }

    /// Fills in missing bounds: `to` defaults to `now`, `from` to 30 days before `to`.
    pub fn resolve(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let to = to.unwrap_or(now);
        let from = from.unwrap_or(to - Duration::days(DEFAULT_RANGE_DAYS));
        Self::new(from, to)
    }

    /// Parses `from,to` where each side is RFC 3339 or `YYYY-MM-DD`.
    ///
    /// Either side may be empty. A date-only `to` covers the whole day.
    pub fn parse_param(raw: &str, now: DateTime<Utc>) -> Result<Self> {
        let (from_raw, to_raw) = raw.split_once(',').ok_or_else(|| {
            Error::invalid_parameter("dateRange", "expected 'from,to'")
        })?;

        let from = parse_bound(from_raw.trim(), false)?;
        let to = parse_bound(to_raw.trim(), true)?;
        Self::resolve(from, to, now)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from <= ts && ts <= self.to
    }
}

fn parse_bound(raw: &str, end_of_day: bool) -> Result<Option<DateTime<Utc>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw, end_of_day).map(Some)
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (UTC).
pub fn parse_timestamp(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        Error::invalid_parameter("dateRange", format!("unparseable timestamp '{}'", raw))
    })?;

    let naive = if end_of_day {
        date.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN))
    } else {
        date.and_time(NaiveTime::MIN)
    };
    Ok(Utc.from_utc_datetime(&naive))
}

/// Time bucket size for trends and cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    fn lookup(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "day" => Some(Self::Daily),
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Parses a cohort type; unknown values are `InvalidCohortType`.
    pub fn parse_cohort_type(s: &str) -> Result<Self> {
        Self::lookup(s).ok_or_else(|| Error::InvalidCohortType(s.to_string()))
    }

    /// Start of the bucket containing `ts`. Weeks start on Monday.
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            Self::Daily => date,
            Self::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Self::Monthly => date.with_day(1).unwrap_or(date),
        };
        Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN))
    }

    /// Moves a bucket start forward by `periods` buckets.
    pub fn advance(&self, bucket_start: DateTime<Utc>, periods: u32) -> DateTime<Utc> {
        match self {
            Self::Daily => bucket_start + Duration::days(i64::from(periods)),
            Self::Weekly => bucket_start + Duration::weeks(i64::from(periods)),
            Self::Monthly => bucket_start
                .checked_add_months(Months::new(periods))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::lookup(s).ok_or_else(|| {
            Error::invalid_parameter("granularity", format!("unsupported granularity '{}'", s))
        })
    }
}

/// Dimension a segment filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKey {
    CustomerType,
    Platform,
    Country,
    DataSource,
}

impl SegmentKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerType => "customerType",
            Self::Platform => "platform",
            Self::Country => "country",
            Self::DataSource => "dataSource",
        }
    }

    fn value_of<'a>(&self, event: &'a AnalyticsEvent) -> Option<&'a str> {
        match self {
            Self::CustomerType => Some(event.customer_type.as_str()),
            Self::Platform => event.platform().map(|p| p.as_str()),
            Self::Country => event.country(),
            Self::DataSource => Some(event.data_quality.data_source.as_str()),
        }
    }
}

impl FromStr for SegmentKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "customerType" => Ok(Self::CustomerType),
            "platform" => Ok(Self::Platform),
            "country" => Ok(Self::Country),
            "dataSource" => Ok(Self::DataSource),
            other => Err(Error::invalid_parameter(
                "segments",
                format!("unknown segment key '{}'", other),
            )),
        }
    }
}

/// Segment filters: values OR within a key, keys AND together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segments(BTreeMap<SegmentKey, Vec<String>>);

impl Segments {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds one `key:value` pair.
    pub fn insert(&mut self, key: SegmentKey, value: impl Into<String>) {
        let values = self.0.entry(key).or_default();
        let value = value.into();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Parses a comma-separated list of `key:value` pairs.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Self::default();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once(':').ok_or_else(|| {
                Error::invalid_parameter("segments", format!("expected key:value, got '{}'", part))
            })?;
            let value = value.trim();
            if value.is_empty() {
                return Err(Error::invalid_parameter(
                    "segments",
                    format!("empty value for '{}'", key),
                ));
            }
            segments.insert(key.trim().parse()?, value);
        }
        Ok(segments)
    }

    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        self.0.iter().all(|(key, values)| {
            key.value_of(event)
                .map(|v| values.iter().any(|want| want == v))
                .unwrap_or(false)
        })
    }
}

/// Sort direction on timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(Error::invalid_parameter(
                "sortOrder",
                format!("expected asc or desc, got '{}'", other),
            )),
        }
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<usize>, limit: Option<usize>) -> Result<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        if page == 0 {
            return Err(Error::invalid_parameter("page", "page starts at 1"));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(Error::invalid_parameter(
                "limit",
                format!("limit must be between 1 and {}", MAX_PAGE_LIMIT),
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit as u64)
    }
}

static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,4})d$").expect("valid period regex"));

/// Parses a lookback period like `30d` into days.
pub fn parse_period(raw: &str) -> Result<u32> {
    let days = PERIOD_RE
        .captures(raw.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| {
            Error::invalid_parameter("period", format!("expected '<days>d', got '{}'", raw))
        })?;

    if days == 0 {
        return Err(Error::invalid_parameter("period", "period must be at least 1d"));
    }
    Ok(days)
}
