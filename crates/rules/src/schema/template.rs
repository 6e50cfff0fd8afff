//! Alert templates: what an alert raised by a rule looks like.

use serde::{Deserialize, Serialize};

use super::RuleCategory;

/// Severity class of an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl AlertType {
    /// Default severity class for rules that do not set one.
    pub fn default_for(category: RuleCategory) -> Self {
        match category {
            RuleCategory::Security => AlertType::Critical,
            RuleCategory::Whale | RuleCategory::Risk => AlertType::High,
            RuleCategory::Trading | RuleCategory::Defi | RuleCategory::Arbitrage => {
                AlertType::Medium
            }
            RuleCategory::Pattern => AlertType::Low,
            RuleCategory::Custom => AlertType::Info,
        }
    }

    /// Fallback severity score when the event carries none.
    pub fn base_severity(&self) -> f64 {
        match self {
            AlertType::Critical => 95.0,
            AlertType::High => 80.0,
            AlertType::Medium => 60.0,
            AlertType::Low => 35.0,
            AlertType::Info => 15.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Critical => "critical",
            AlertType::High => "high",
            AlertType::Medium => "medium",
            AlertType::Low => "low",
            AlertType::Info => "info",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation class of an alert action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    #[default]
    Primary,
    Secondary,
    Danger,
}

/// An action attached to an alert.
///
/// `handler_ref` is opaque to the rule engine; the dispatcher resolves it to
/// a notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertAction {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub kind: ActionKind,
    pub handler_ref: String,
}

/// Per-rule description of the alert emitted on a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertTemplate {
    /// Severity class; derived from the rule category when unset.
    pub alert_type: Option<AlertType>,
    /// Alert title; the rule name when unset.
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub actions: Vec<AlertAction>,
    pub expires_in_minutes: Option<u32>,
    /// Event attribute naming the related wallet or token.
    pub entity_field: Option<String>,
    pub severity_score: Option<f64>,
    pub confidence_score: Option<f64>,
    pub estimated_impact: Option<f64>,
}
