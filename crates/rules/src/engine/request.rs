//! Alert creation requests emitted by the engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chainwatch_core::{Event, EventId};

use crate::schema::{AlertAction, AlertType, Rule, RuleCategory};
use crate::scoring::AlertScores;

/// Everything the alert store needs to materialize an alert for one rule
/// match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertCreationRequest {
    pub rule_id: String,
    pub rule_name: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub category: RuleCategory,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub scores: AlertScores,
    pub tags: Vec<String>,
    pub related_entity: Option<String>,
    pub actions: Vec<AlertAction>,
    pub triggered_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub event_id: EventId,
    pub event_type: String,
}

impl AlertCreationRequest {
    pub(crate) fn build(rule: &Rule, event: &Event, scores: AlertScores, now: DateTime<Utc>) -> Self {
        let template = &rule.alert;

        let description = template
            .description
            .clone()
            .or_else(|| rule.description.clone())
            .unwrap_or_else(|| format!("{} matched a {} event", rule.name, event.event_type));

        Self {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            alert_type: rule.alert_type(),
            category: rule.category,
            title: template.title.clone().unwrap_or_else(|| rule.name.clone()),
            description,
            scores,
            tags: template.tags.clone(),
            related_entity: related_entity(rule, event),
            actions: template.actions.clone(),
            triggered_at: now,
            expires_at: template
                .expires_in_minutes
                .map(|m| now + Duration::minutes(m as i64)),
            event_id: event.id,
            event_type: event.event_type.clone(),
        }
    }
}

/// The template's entity attribute if the event carries it as a scalar,
/// otherwise the event's own related entity.
fn related_entity(rule: &Rule, event: &Event) -> Option<String> {
    let from_field = rule
        .alert
        .entity_field
        .as_deref()
        .and_then(|name| event.field(name))
        .and_then(|value| match value.as_ref() {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    from_field.or_else(|| event.related_entity.clone())
}
