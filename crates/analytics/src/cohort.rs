//! Acquisition cohorts and period retention.
//!
//! A customer is acquired by their first event ever. Customers acquired on
//! or after the start date join the cohort of that event's bucket; earlier
//! customers are excluded even if they are still active. Retention at period `p` counts members with any
//! event in the bucket `p` units after the cohort bucket, so customers who
//! lapse and return are counted again. Periods whose bucket has not begun
//! yet are reported as `None` and left out of the averages.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use insights_core::limits::MAX_RETENTION_PERIOD;
use insights_core::{AnalyticsEvent, Error, Granularity, Result};

/// Periods used when the caller gives none.
pub const DEFAULT_RETENTION_PERIODS: [u32; 4] = [1, 3, 6, 12];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRequest {
    pub cohort_type: Granularity,
    pub retention_periods: Vec<u32>,
    pub start_date: DateTime<Utc>,
}

impl CohortRequest {
    /// Fills defaults (monthly, `[1, 3, 6, 12]`, twelve months back) and
    /// validates the periods.
    pub fn new(
        cohort_type: Option<Granularity>,
        retention_periods: Option<Vec<u32>>,
        start_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut periods = retention_periods.unwrap_or_else(|| DEFAULT_RETENTION_PERIODS.to_vec());
        if periods.is_empty() {
            return Err(Error::invalid_parameter(
                "retentionPeriods",
                "at least one period is required",
            ));
        }
        if let Some(p) = periods.iter().find(|p| **p > MAX_RETENTION_PERIOD) {
            return Err(Error::invalid_parameter(
                "retentionPeriods",
                format!("period {} exceeds {}", p, MAX_RETENTION_PERIOD),
            ));
        }
        periods.sort_unstable();
        periods.dedup();

        let start_date = start_date.unwrap_or_else(|| {
            now.checked_sub_months(Months::new(12))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        });
        if start_date > now {
            return Err(Error::InvalidRange {
                from: start_date,
                to: now,
            });
        }

        Ok(Self {
            cohort_type: cohort_type.unwrap_or(Granularity::Monthly),
            retention_periods: periods,
            start_date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRetention {
    pub period: u32,
    pub retained: Option<u64>,
    /// Fraction in `[0, 1]`; `None` when the period has not been reached
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRow {
    pub cohort_start: DateTime<Utc>,
    pub size: u64,
    pub retention: Vec<PeriodRetention>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageRetention {
    pub period: u32,
    pub rate: Option<f64>,
    /// Cohorts that reached this period
    pub cohorts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortReport {
    pub cohort_type: Granularity,
    pub start_date: DateTime<Utc>,
    pub retention_periods: Vec<u32>,
    pub cohorts: Vec<CohortRow>,
    pub average_retention: Vec<AverageRetention>,
}

/// Buckets customers and measures retention as of `now`.
///
/// `events` must cover each customer's full history, not just the events
/// after the start date, so acquisition can be told apart from activity.
pub fn analyze_cohorts(
    request: &CohortRequest,
    events: &[AnalyticsEvent],
    now: DateTime<Utc>,
) -> CohortReport {
    let granularity = request.cohort_type;

    let mut first_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
    let mut active_buckets: HashMap<&str, HashSet<DateTime<Utc>>> = HashMap::new();

    for event in events.iter().filter(|e| e.timestamp <= now) {
        let customer = event.customer_id.as_str();
        first_seen
            .entry(customer)
            .and_modify(|ts| *ts = (*ts).min(event.timestamp))
            .or_insert(event.timestamp);
        active_buckets
            .entry(customer)
            .or_default()
            .insert(granularity.truncate(event.timestamp));
    }
    first_seen.retain(|_, first| *first >= request.start_date);

    let mut members: BTreeMap<DateTime<Utc>, Vec<&str>> = BTreeMap::new();
    for (customer, first) in &first_seen {
        members
            .entry(granularity.truncate(*first))
            .or_default()
            .push(*customer);
    }

    let cohorts: Vec<CohortRow> = members
        .into_iter()
        .map(|(cohort_start, customers)| {
            let size = customers.len() as u64;
            let retention = request
                .retention_periods
                .iter()
                .map(|&period| {
                    let target = granularity.advance(cohort_start, period);
                    if target > now {
                        return PeriodRetention {
                            period,
                            retained: None,
                            rate: None,
                        };
                    }
                    let retained = customers
                        .iter()
                        .filter(|c| {
                            active_buckets
                                .get(*c)
                                .is_some_and(|buckets| buckets.contains(&target))
                        })
                        .count() as u64;
                    PeriodRetention {
                        period,
                        retained: Some(retained),
                        rate: Some(retained as f64 / size as f64),
                    }
                })
                .collect();
            CohortRow {
                cohort_start,
                size,
                retention,
            }
        })
        .collect();

    let average_retention = request
        .retention_periods
        .iter()
        .enumerate()
        .map(|(i, &period)| {
            let rates: Vec<f64> = cohorts.iter().filter_map(|c| c.retention[i].rate).collect();
            AverageRetention {
                period,
                rate: crate::aggregate::mean(rates.iter().copied()),
                cohorts: rates.len() as u64,
            }
        })
        .collect();

    CohortReport {
        cohort_type: granularity,
        start_date: request.start_date,
        retention_periods: request.retention_periods.clone(),
        cohorts,
        average_retention,
    }
}
