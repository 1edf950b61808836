//! Ordered conversion funnels.
//!
//! An event belongs to a step when its `conversionStep` or `funnelStage`
//! equals the step name. A customer converts at step `i` only if they
//! were also present at step `i - 1`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use insights_core::limits::MAX_FUNNEL_STEPS;
use insights_core::{AnalyticsEvent, Error, Result};

use crate::aggregate::percent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStepStats {
    pub step: String,
    /// Distinct customers tagged with this step
    pub users: u64,
    /// Customers present at both the previous step and this one
    pub conversions: u64,
    /// Percent of the previous step's users who reached this step,
    /// `conversions / previous.users * 100`. The first step reports 100
    /// when it has any users.
    pub conversion_rate: f64,
    /// Percent of the previous step's users who did not reach this step,
    /// `(previous.users - conversions) / previous.users * 100`. Always 0 for
    /// the first step.
    pub dropoff_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dropoff {
    pub step: String,
    pub index: usize,
    pub dropoff_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelReport {
    pub steps: Vec<String>,
    pub per_step: Vec<FunnelStepStats>,
    pub total_conversion_rate: f64,
    pub biggest_dropoff: Option<Dropoff>,
}

/// Trims step names and rejects empty, blank, duplicate or oversized funnels.
pub fn validate_steps(steps: &[String]) -> Result<Vec<String>> {
    if steps.is_empty() {
        return Err(Error::invalid_funnel("at least one step is required"));
    }
    if steps.len() > MAX_FUNNEL_STEPS {
        return Err(Error::invalid_funnel(format!(
            "{} steps exceeds the limit of {}",
            steps.len(),
            MAX_FUNNEL_STEPS
        )));
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        let step = step.trim();
        if step.is_empty() {
            return Err(Error::invalid_funnel(format!("step {} is blank", i)));
        }
        if !seen.insert(step) {
            return Err(Error::invalid_funnel(format!("step '{}' appears twice", step)));
        }
        cleaned.push(step.to_string());
    }
    Ok(cleaned)
}

/// Computes step statistics over pre-filtered events.
///
/// Rates are relative to the previous step's users so that the product
/// of step rates equals the end-to-end conversion. Step 0 converts at
/// 100% whenever it has any users.
pub fn analyze_funnel(steps: &[String], events: &[AnalyticsEvent]) -> FunnelReport {
    let users_at: Vec<HashSet<&str>> = steps
        .iter()
        .map(|step| {
            events
                .iter()
                .filter(|e| e.matches_step(step))
                .map(|e| e.customer_id.as_str())
                .collect()
        })
        .collect();

    let mut per_step = Vec::with_capacity(steps.len());
    let mut total = 1.0;

    for (i, step) in steps.iter().enumerate() {
        let users = users_at[i].len() as u64;
        let (conversions, conversion_rate, dropoff_rate) = if i == 0 {
            (users, if users > 0 { 100.0 } else { 0.0 }, 0.0)
        } else {
            let previous = users_at[i - 1].len() as u64;
            let converted = users_at[i].intersection(&users_at[i - 1]).count() as u64;
            (
                converted,
                percent(converted, previous),
                percent(previous - converted, previous),
            )
        };

        total *= conversion_rate / 100.0;
        per_step.push(FunnelStepStats {
            step: step.clone(),
            users,
            conversions,
            conversion_rate,
            dropoff_rate,
        });
    }

    let biggest_dropoff = per_step
        .iter()
        .enumerate()
        .fold(None::<(usize, f64)>, |best, (i, s)| match best {
            Some((_, rate)) if rate >= s.dropoff_rate => best,
            _ => Some((i, s.dropoff_rate)),
        })
        .map(|(index, dropoff_rate)| Dropoff {
            step: steps[index].clone(),
            index,
            dropoff_rate,
        });

    FunnelReport {
        steps: steps.to_vec(),
        per_step,
        total_conversion_rate: if steps.is_empty() { 0.0 } else { total * 100.0 },
        biggest_dropoff,
    }
}
