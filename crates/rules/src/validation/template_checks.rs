//! Alert template validation: actions, score overrides, expiry, tags.

use std::collections::HashSet;

use crate::schema::*;
use super::ValidationResult;

pub(super) fn validate_alert_template(alert: &AlertTemplate, result: &mut ValidationResult) {
    if let Some(title) = &alert.title {
        if title.trim().is_empty() {
            result.error("alert.title", "title must not be empty when set");
        }
    }

    if let Some(field) = &alert.entity_field {
        if field.trim().is_empty() {
            result.error("alert.entityField", "entityField must not be empty when set");
        }
    }

    if alert.expires_in_minutes == Some(0) {
        result.error("alert.expiresInMinutes", "expiresInMinutes must be greater than 0");
    }

    check_score(alert.severity_score, "alert.severityScore", result);
    check_score(alert.confidence_score, "alert.confidenceScore", result);
    check_score(alert.estimated_impact, "alert.estimatedImpact", result);

    let mut seen_tags = HashSet::new();
    for (i, tag) in alert.tags.iter().enumerate() {
        if tag.trim().is_empty() {
            result.error(format!("alert.tags[{i}]"), "tags must not be empty");
        } else if !seen_tags.insert(tag.as_str()) {
            result.warn(format!("alert.tags[{i}]"), format!("duplicate tag '{tag}'"));
        }
    }

    validate_actions(&alert.actions, result);
}

fn validate_actions(actions: &[AlertAction], result: &mut ValidationResult) {
    let mut seen_ids = HashSet::new();

    for (i, action) in actions.iter().enumerate() {
        let path = format!("alert.actions[{i}]");

        if action.id.trim().is_empty() {
            result.error(format!("{path}.id"), "action id must not be empty");
        } else if !seen_ids.insert(action.id.as_str()) {
            result.error(format!("{path}.id"), format!("duplicate action id '{}'", action.id));
        }

        if action.label.trim().is_empty() {
            result.error(format!("{path}.label"), "action label must not be empty");
        }

        let handler = action.handler_ref.trim();
        if handler.is_empty() {
            result.error(format!("{path}.handlerRef"), "handlerRef must not be empty");
        } else if handler.contains("://") {
            result.warn(
                format!("{path}.handlerRef"),
                "handlerRef should name a registered channel, not a URL",
            );
        }
    }
}

fn check_score(score: Option<f64>, path: &str, result: &mut ValidationResult) {
    if let Some(v) = score {
        if !v.is_finite() || !(0.0..=100.0).contains(&v) {
            result.error(path, format!("score must be between 0 and 100, got {v}"));
        }
    }
}
