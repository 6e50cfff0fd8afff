//! Single-condition evaluation against an event's attribute map.
//!
//! Missing attributes and non-numeric operands evaluate to `false`; events
//! are untrusted and heterogeneous. Operator/value combinations that
//! validation rejects surface as [`EvalFault`] instead.

use serde_json::Value;

use chainwatch_core::Event;

use crate::schema::{ComparisonOperator, Condition};

/// A condition that cannot be evaluated because its own definition is
/// malformed (e.g. `in` against a non-list). Only reachable for rules that
/// bypassed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("condition '{field} {operator}' is malformed: {reason}")]
pub struct EvalFault {
    pub field: String,
    pub operator: ComparisonOperator,
    pub reason: String,
}

impl EvalFault {
    fn new(condition: &Condition, reason: impl Into<String>) -> Self {
        Self {
            field: condition.field.clone(),
            operator: condition.operator,
            reason: reason.into(),
        }
    }
}

/// Evaluate one condition, reporting malformed conditions as faults.
pub fn try_evaluate_condition(condition: &Condition, event: &Event) -> Result<bool, EvalFault> {
    let expected = &condition.value;

    // Condition-side checks run first so that a malformed condition is
    // reported even when the event lacks the field.
    match condition.operator {
        op @ (ComparisonOperator::Gt
        | ComparisonOperator::Gte
        | ComparisonOperator::Lt
        | ComparisonOperator::Lte) => {
            let Some(threshold) = as_number(expected) else {
                return Err(EvalFault::new(condition, "comparison value is not numeric"));
            };
            let actual = event
                .field(&condition.field)
                .and_then(|v| as_number(&v));
            Ok(actual.is_some_and(|actual| compare(op, actual, threshold)))
        }
        ComparisonOperator::Eq => {
            if !is_scalar(expected) {
                return Err(EvalFault::new(condition, "eq requires a scalar value"));
            }
            Ok(event
                .field(&condition.field)
                .is_some_and(|actual| values_equal(&actual, expected)))
        }
        ComparisonOperator::Contains => {
            if !is_scalar(expected) {
                return Err(EvalFault::new(condition, "contains requires a scalar value"));
            }
            Ok(event
                .field(&condition.field)
                .is_some_and(|actual| contains(&actual, expected)))
        }
        ComparisonOperator::In => {
            let Value::Array(members) = expected else {
                return Err(EvalFault::new(condition, "in requires a list value"));
            };
            Ok(event.field(&condition.field).is_some_and(|actual| {
                is_scalar(&actual) && members.iter().any(|m| values_equal(&actual, m))
            }))
        }
    }
}

fn compare(op: ComparisonOperator, actual: f64, threshold: f64) -> bool {
    match op {
        ComparisonOperator::Gt => actual > threshold,
        ComparisonOperator::Gte => actual >= threshold,
        ComparisonOperator::Lt => actual < threshold,
        ComparisonOperator::Lte => actual <= threshold,
        ComparisonOperator::Eq | ComparisonOperator::Contains | ComparisonOperator::In => false,
    }
}

/// Evaluate one condition; malformed conditions never match.
pub fn evaluate_condition(condition: &Condition, event: &Event) -> bool {
    try_evaluate_condition(condition, event).unwrap_or(false)
}

// ── Value normalization ─────────────────────────────────────────────

/// Numeric view of a value: JSON numbers, or strings that parse as a finite number.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Equality after normalization: numeric when either side is a JSON number,
/// otherwise same-type comparison.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            match (as_number(actual), as_number(expected)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

/// Substring test for string attributes, membership for list attributes.
fn contains(actual: &Value, needle: &Value) -> bool {
    match actual {
        Value::String(haystack) => match needle {
            Value::String(s) => haystack.contains(s.as_str()),
            other => haystack.contains(&other.to_string()),
        },
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        _ => false,
    }
}
