//! Heuristic predictive scores.
//!
//! These are deterministic functions of observable history, not trained
//! models. Output shapes are stable so the scoring can be swapped later.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use insights_core::{AnalyticsEvent, EventType};

/// Trailing window for churn scoring.
pub const CHURN_WINDOW_DAYS: i64 = 7;

/// Events considered when adjusting next-action probabilities.
const RECENT_EVENTS: usize = 10;

/// Event count at which confidence saturates.
const CONFIDENCE_SATURATION: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnRisk {
    pub score: Tier,
    pub recent_events: u64,
    pub window_days: i64,
    pub factors: Vec<String>,
}

/// Churn tier from activity in the trailing seven days.
pub fn churn_risk(events: &[AnalyticsEvent], now: DateTime<Utc>) -> ChurnRisk {
    let since = now - Duration::days(CHURN_WINDOW_DAYS);
    let recent: Vec<&AnalyticsEvent> = events
        .iter()
        .filter(|e| e.timestamp >= since && e.timestamp <= now)
        .collect();
    let count = recent.len() as u64;

    let score = match count {
        0..=1 => Tier::High,
        2..=5 => Tier::Medium,
        _ => Tier::Low,
    };

    let mut factors = Vec::new();
    if count <= 1 {
        factors.push("low activity in the last 7 days".to_string());
    }
    if recent.iter().any(|e| e.event_type == EventType::ErrorOccurred) {
        factors.push("recent errors".to_string());
    }
    if recent
        .iter()
        .any(|e| e.event_type == EventType::SupportContacted)
    {
        factors.push("recent support contact".to_string());
    }
    if events.iter().any(|e| e.event_type == EventType::UnitBooking) {
        factors.push("has an active booking history".to_string());
    }

    ChurnRisk {
        score,
        recent_events: count,
        window_days: CHURN_WINDOW_DAYS,
        factors,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerValue {
    pub total_revenue: f64,
    pub predicted_lifetime_value: f64,
    pub value_segment: Tier,
}

/// Revenue-based value segment over the customer's full history.
pub fn customer_value(events: &[AnalyticsEvent]) -> CustomerValue {
    let total_revenue: f64 = events.iter().filter_map(|e| e.positive_revenue()).sum();

    let value_segment = if total_revenue > 1000.0 {
        Tier::High
    } else if total_revenue > 200.0 {
        Tier::Medium
    } else {
        Tier::Low
    };

    CustomerValue {
        total_revenue,
        predicted_lifetime_value: total_revenue * 2.5,
        value_segment,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextAction {
    pub action: String,
    pub probability: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Candidate next actions, most likely first.
///
/// `events` must be newest first; only the latest few are considered.
pub fn next_actions(events: &[AnalyticsEvent]) -> Vec<NextAction> {
    let recent: Vec<EventType> = events.iter().take(RECENT_EVENTS).map(|e| e.event_type).collect();
    let saw = |t: EventType| recent.contains(&t);

    let mut view: f64 = 0.8;
    let mut book: f64 = 0.6;
    let mut support: f64 = 0.3;

    if saw(EventType::UnitView) && !saw(EventType::UnitBooking) {
        book += 0.2;
    }
    if saw(EventType::StorageSearch) {
        view += 0.1;
    }
    if saw(EventType::UnitBooking) || saw(EventType::PaymentCompleted) {
        view -= 0.2;
        book -= 0.3;
    }
    if saw(EventType::ErrorOccurred) || saw(EventType::SupportContacted) {
        support += 0.3;
    }

    let mut actions = vec![
        NextAction {
            action: "View Storage Units".to_string(),
            probability: round2(view.clamp(0.0, 1.0)),
        },
        NextAction {
            action: "Book Storage".to_string(),
            probability: round2(book.clamp(0.0, 1.0)),
        },
        NextAction {
            action: "Contact Support".to_string(),
            probability: round2(support.clamp(0.0, 1.0)),
        },
    ];
    actions.sort_by(|a, b| {
        b.probability
            .total_cmp(&a.probability)
            .then_with(|| a.action.cmp(&b.action))
    });
    actions
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub confidence: f64,
}

pub fn recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            kind: "Product".to_string(),
            title: "Recommended Storage Size".to_string(),
            description: "Based on your inventory, a 10x10 unit would be optimal".to_string(),
            confidence: 0.85,
        },
        Recommendation {
            kind: "Feature".to_string(),
            title: "Mobile App".to_string(),
            description: "Download our mobile app for easier inventory management".to_string(),
            confidence: 0.70,
        },
    ]
}

/// Confidence in `[0.7, 1.0]`, growing with observed history.
pub fn confidence(total_events: usize) -> f64 {
    let coverage = (total_events as f64 / CONFIDENCE_SATURATION).min(1.0);
    round2(0.7 + 0.3 * coverage)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictiveInsights {
    pub customer_id: String,
    pub churn_risk: ChurnRisk,
    pub customer_value: CustomerValue,
    pub next_actions: Vec<NextAction>,
    pub recommendations: Vec<Recommendation>,
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

/// All scores for one customer; `events` is their full history, newest first.
pub fn predictive_insights(
    customer_id: &str,
    events: &[AnalyticsEvent],
    now: DateTime<Utc>,
) -> PredictiveInsights {
    PredictiveInsights {
        customer_id: customer_id.to_string(),
        churn_risk: churn_risk(events, now),
        customer_value: customer_value(events),
        next_actions: next_actions(events),
        recommendations: recommendations(),
        confidence: confidence(events.len()),
        generated_at: now,
    }
}
