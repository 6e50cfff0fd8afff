//! The alert entity and its notification summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chainwatch_core::EventId;
use chainwatch_rules::schema::{AlertAction, AlertType, RuleCategory};
use chainwatch_rules::AlertCreationRequest;

pub type AlertId = Uuid;

/// A raised alert.
///
/// `is_active` only ever goes from `true` to `false` (dismissal or expiry
/// sweep). Whether an alert counts as active at a given instant is
/// [`is_live`](Alert::is_live), which also honours `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub rule_id: String,
    pub rule_name: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub category: RuleCategory,
    pub title: String,
    pub description: String,
    pub severity_score: f64,
    pub confidence_score: f64,
    pub estimated_impact: f64,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub is_active: bool,
    pub is_pinned: bool,
    pub tags: Vec<String>,
    pub related_entity: Option<String>,
    pub actions: Vec<AlertAction>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub event_id: EventId,
    /// Insertion order; breaks timestamp ties in listings.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Alert {
    pub(crate) fn from_request(request: AlertCreationRequest, seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: request.rule_id,
            rule_name: request.rule_name,
            alert_type: request.alert_type,
            category: request.category,
            title: request.title,
            description: request.description,
            severity_score: request.scores.severity_score,
            confidence_score: request.scores.confidence_score,
            estimated_impact: request.scores.estimated_impact,
            timestamp: request.triggered_at,
            expires_at: request.expires_at,
            is_read: false,
            is_active: true,
            is_pinned: false,
            tags: request.tags,
            related_entity: request.related_entity,
            actions: request.actions,
            dismissed_at: None,
            event_id: request.event_id,
            seq,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Active and not past its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }

    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            id: self.id,
            rule_id: self.rule_id.clone(),
            rule_name: self.rule_name.clone(),
            alert_type: self.alert_type,
            category: self.category,
            title: self.title.clone(),
            description: self.description.clone(),
            severity_score: self.severity_score,
            confidence_score: self.confidence_score,
            estimated_impact: self.estimated_impact,
            related_entity: self.related_entity.clone(),
            tags: self.tags.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// The part of an alert handed to notification channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertSummary {
    pub id: AlertId,
    pub rule_id: String,
    pub rule_name: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub category: RuleCategory,
    pub title: String,
    pub description: String,
    pub severity_score: f64,
    pub confidence_score: f64,
    pub estimated_impact: f64,
    pub related_entity: Option<String>,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
