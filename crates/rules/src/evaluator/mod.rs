//! Rule evaluation against a single event.
//!
//! A rule's compiled [`MatchExpr`] is evaluated recursively: `and` nodes
//! require every child, `or` nodes any child, both short-circuiting. For
//! trees compiled from a flat condition list this is exactly the strict
//! left-to-right fold implemented by [`fold_conditions`]:
//!
//! ```text
//! result = eval(C1)
//! for i in 2..=n:
//!     result = result AND eval(Ci)   if Ci.logicalOperator == AND
//!     result = result OR  eval(Ci)   if Ci.logicalOperator == OR
//! ```
//!
//! A condition skipped by short-circuiting is never evaluated, so a malformed
//! condition in a skipped position does not fault.

mod condition;

pub use condition::{evaluate_condition, try_evaluate_condition, EvalFault};
pub(crate) use condition::as_number;

use chainwatch_core::Event;

use crate::schema::{Condition, LogicalOperator, MatchExpr, Rule};

// ── Rule evaluator ──────────────────────────────────────────────────

/// Evaluates rules against events. Stateless; cooldown and enablement are
/// the engine's concern.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Whether the event satisfies the rule's match logic. Faults count as
    /// no match.
    pub fn matches(rule: &Rule, event: &Event) -> bool {
        Self::try_matches(rule, event).unwrap_or(false)
    }

    /// Like [`matches`](Self::matches) but surfaces malformed conditions.
    pub fn try_matches(rule: &Rule, event: &Event) -> Result<bool, EvalFault> {
        evaluate_expr(&rule.expression, event)
    }
}

/// Evaluate an expression tree.
pub fn evaluate_expr(expr: &MatchExpr, event: &Event) -> Result<bool, EvalFault> {
    match expr {
        MatchExpr::Leaf(condition) => try_evaluate_condition(condition, event),
        MatchExpr::And(children) => {
            for child in children {
                if !evaluate_expr(child, event)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        MatchExpr::Or(children) => {
            for child in children {
                if evaluate_expr(child, event)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Fold a flat condition list left to right without operator precedence.
///
/// The first condition's operator is ignored; a missing operator on a later
/// condition means `AND`. An empty list never matches.
pub fn fold_conditions(conditions: &[Condition], event: &Event) -> Result<bool, EvalFault> {
    let Some((first, rest)) = conditions.split_first() else {
        return Ok(false);
    };

    let mut result = try_evaluate_condition(first, event)?;
    for condition in rest {
        result = match condition.logical_operator.unwrap_or(LogicalOperator::And) {
            LogicalOperator::And => result && try_evaluate_condition(condition, event)?,
            LogicalOperator::Or => result || try_evaluate_condition(condition, event)?,
        };
    }
    Ok(result)
}
