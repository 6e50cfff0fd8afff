//! Alert query filters.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use chainwatch_rules::schema::{AlertType, RuleCategory};

use crate::alert::Alert;

/// Conjunctive alert filter; unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertFilter {
    /// `true`: live alerts only. `false`: dismissed or expired only.
    pub active: Option<bool>,
    /// `activeOnly=true` is shorthand for `active=true`; `false` leaves the
    /// activity partition unfiltered.
    pub active_only: Option<bool>,
    #[serde(rename = "type")]
    pub alert_type: Option<AlertType>,
    pub category: Option<RuleCategory>,
    pub is_read: Option<bool>,
    /// Inclusive lower bound on `severityScore`.
    pub min_severity: Option<f64>,
    pub rule_id: Option<String>,
    pub is_pinned: Option<bool>,
    pub limit: Option<usize>,
}

impl AlertFilter {
    pub fn active_only() -> Self {
        Self {
            active: Some(true),
            ..Self::default()
        }
    }

    fn activity(&self) -> Option<bool> {
        match self.active_only {
            Some(true) => Some(true),
            _ => self.active,
        }
    }

    pub fn matches(&self, alert: &Alert, now: DateTime<Utc>) -> bool {
        self.activity().map_or(true, |a| alert.is_live(now) == a)
            && self.alert_type.map_or(true, |t| alert.alert_type == t)
            && self.category.map_or(true, |c| alert.category == c)
            && self.is_read.map_or(true, |r| alert.is_read == r)
            && self.min_severity.map_or(true, |s| alert.severity_score >= s)
            && self.rule_id.as_ref().map_or(true, |id| &alert.rule_id == id)
            && self.is_pinned.map_or(true, |p| alert.is_pinned == p)
    }
}
