//! Condition and match-tree validation: operator/value compatibility,
//! condition chaining, tree shape, and field-name hints.

use serde_json::Value;

use crate::schema::*;
use super::ValidationResult;
use super::fuzzy::fuzzy_match;

// ── Known event attributes ──────────────────────────────────────────

/// Attribute names emitted by the ingestion collaborators. Events are open
/// maps, so an unknown field is not an error; a near-miss gets a warning.
const KNOWN_EVENT_FIELDS: &[&str] = &[
    "type",
    "eventType",
    "transferAmountUsd",
    "transferAmount",
    "fromAddress",
    "toAddress",
    "token",
    "tokenSymbol",
    "chain",
    "walletAge",
    "walletRiskScore",
    "riskScore",
    "apy",
    "tvlUsd",
    "liquidityUsd",
    "liquidityChangePct",
    "priceUsd",
    "priceChangePct",
    "volumeUsd",
    "volumeChangePct",
    "spreadPct",
    "sentimentScore",
    "protocol",
    "pool",
    "memo",
    "exchange",
    "labels",
    "tags",
    "auditStatus",
    "severityScore",
    "confidenceScore",
    "estimatedImpact",
];

/// Deepest `match` tree accepted.
const MAX_MATCH_DEPTH: usize = 16;

// ── Match logic ─────────────────────────────────────────────────────

pub(super) fn validate_match_logic(def: &RuleDefinition, result: &mut ValidationResult) {
    match (def.conditions.is_empty(), &def.expression) {
        (false, Some(_)) => {
            result.error(
                "",
                "Exactly one of 'conditions' or 'match' must be set, but both are present",
            );
        }
        (true, None) => {
            result.error("conditions", "rule must have at least one condition");
        }
        (false, None) => validate_condition_chain(&def.conditions, result),
        (true, Some(expr)) => {
            if expr.depth() > MAX_MATCH_DEPTH {
                result.error(
                    "match",
                    format!("match tree is nested deeper than {MAX_MATCH_DEPTH} levels"),
                );
            }
            validate_expr(expr, "match", result);
        }
    }
}

fn validate_condition_chain(conditions: &[Condition], result: &mut ValidationResult) {
    let mut seen_and = false;
    let mut seen_or = false;

    for (i, condition) in conditions.iter().enumerate() {
        let path = format!("conditions[{i}]");
        validate_condition(condition, &path, result);

        match (i, condition.logical_operator) {
            (0, Some(_)) => result.warn(
                format!("{path}.logicalOperator"),
                "logicalOperator on the first condition is ignored",
            ),
            (0, None) => {}
            (_, None) => result.warn(
                format!("{path}.logicalOperator"),
                "missing logicalOperator, defaulting to AND",
            ),
            (_, Some(LogicalOperator::And)) => seen_and = true,
            (_, Some(LogicalOperator::Or)) => seen_or = true,
        }
    }

    if seen_and && seen_or {
        result.warn(
            "conditions",
            "AND and OR are combined strictly left to right (no precedence); \
             use 'match' for explicit grouping",
        );
    }
}

fn validate_expr(expr: &MatchExpr, path: &str, result: &mut ValidationResult) {
    match expr {
        MatchExpr::Leaf(condition) => {
            let leaf_path = format!("{path}.leaf");
            if condition.logical_operator.is_some() {
                result.warn(
                    format!("{leaf_path}.logicalOperator"),
                    "logicalOperator is ignored inside a match tree",
                );
            }
            validate_condition(condition, &leaf_path, result);
        }
        MatchExpr::And(children) | MatchExpr::Or(children) => {
            let node = if matches!(expr, MatchExpr::And(_)) { "and" } else { "or" };
            let node_path = format!("{path}.{node}");
            if children.is_empty() {
                result.error(&node_path, format!("'{node}' must have at least one child"));
            }
            for (i, child) in children.iter().enumerate() {
                validate_expr(child, &format!("{node_path}[{i}]"), result);
            }
        }
    }
}

// ── Single condition ────────────────────────────────────────────────

pub(super) fn validate_condition(condition: &Condition, path: &str, result: &mut ValidationResult) {
    let field = condition.field.trim();
    if field.is_empty() {
        result.error(format!("{path}.field"), "field must not be empty");
    } else if !KNOWN_EVENT_FIELDS.contains(&field) {
        if let Some(s) = fuzzy_match(field, KNOWN_EVENT_FIELDS) {
            result.warn(
                format!("{path}.field"),
                format!("Unknown event field '{field}'. Did you mean '{s}'?"),
            );
        }
    }

    let value_path = format!("{path}.value");
    let op = condition.operator;
    match op {
        ComparisonOperator::Gt
        | ComparisonOperator::Gte
        | ComparisonOperator::Lt
        | ComparisonOperator::Lte => {
            if !condition.value.is_number() {
                let message = format!(
                    "operator '{op}' requires a numeric value, got {}",
                    describe(&condition.value)
                );
                match numeric_hint(&condition.value) {
                    Some(hint) => result.error_with_suggestion(&value_path, message, hint),
                    None => result.error(&value_path, message),
                }
            }
        }
        ComparisonOperator::Eq | ComparisonOperator::Contains => {
            if !is_scalar(&condition.value) {
                result.error(
                    &value_path,
                    format!(
                        "operator '{op}' requires a string, number or boolean value, got {}",
                        describe(&condition.value)
                    ),
                );
            }
        }
        ComparisonOperator::In => match &condition.value {
            Value::Array(items) if items.is_empty() => {
                result.error(&value_path, "operator 'in' requires a non-empty list");
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !is_scalar(item) {
                        result.error(
                            format!("{value_path}[{i}]"),
                            format!("list members must be scalars, got {}", describe(item)),
                        );
                    }
                }
            }
            other => {
                result.error_with_suggestion(
                    &value_path,
                    format!("operator 'in' requires a list value, got {}", describe(other)),
                    "Use 'eq' for a single value or wrap it in a list",
                );
            }
        },
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Suggest dropping the quotes when a numeric operator got a numeric string.
fn numeric_hint(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    s.trim()
        .parse::<f64>()
        .ok()
        .map(|n| format!("Did you mean the number {n} (without quotes)?"))
}
