//! Alert scoring seam.
//!
//! Severity, confidence and impact scores are computed outside the engine;
//! the engine only carries them onto the alert. [`EventFieldScorer`] is the
//! default collaborator and reads pre-computed scores off the event.

use serde::{Deserialize, Serialize};

use chainwatch_core::Event;

use crate::evaluator::as_number;
use crate::schema::Rule;

/// Confidence used when neither the event nor the rule supplies one.
pub const DEFAULT_CONFIDENCE: f64 = 70.0;

/// Scores attached to an alert, each in `0..=100`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertScores {
    pub severity_score: f64,
    pub confidence_score: f64,
    pub estimated_impact: f64,
}

/// Computes scores for an alert raised by `rule` on `event`.
pub trait AlertScorer: Send + Sync {
    fn score(&self, rule: &Rule, event: &Event) -> AlertScores;
}

/// Reads `severityScore`, `confidenceScore` and `estimatedImpact` from the
/// event. Missing or non-numeric values fall back to the rule's template,
/// then to defaults derived from the alert type. Impact defaults to the
/// resolved severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventFieldScorer;

impl AlertScorer for EventFieldScorer {
    fn score(&self, rule: &Rule, event: &Event) -> AlertScores {
        let read = |name: &str| event.field(name).and_then(|v| as_number(&v));
        let template = &rule.alert;

        let severity = read("severityScore")
            .or(template.severity_score)
            .unwrap_or_else(|| rule.alert_type().base_severity());
        let confidence = read("confidenceScore")
            .or(template.confidence_score)
            .unwrap_or(DEFAULT_CONFIDENCE);
        let impact = read("estimatedImpact")
            .or(template.estimated_impact)
            .unwrap_or(severity);

        AlertScores {
            severity_score: clamp_score(severity),
            confidence_score: clamp_score(confidence),
            estimated_impact: clamp_score(impact),
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
