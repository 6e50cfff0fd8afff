//! Boolean match expression over conditions.
//!
//! Every registered rule carries one `MatchExpr`, compiled when the rule is
//! created. Flat condition lists (each condition holding its own AND/OR) are
//! compiled so that the tree reproduces a strict left-to-right fold: `AND`
//! does not bind tighter than `OR`.

use serde::{Deserialize, Serialize};

use super::{Condition, LogicalOperator};

/// A leaf condition or an `and` / `or` node over child expressions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MatchExpr {
    Leaf(Condition),
    And(Vec<MatchExpr>),
    Or(Vec<MatchExpr>),
}

impl MatchExpr {
    /// Compile a flat condition list into an expression tree.
    ///
    /// `[C1, C2(AND), C3(OR)]` becomes `Or[And[C1, C2], C3]`. A missing
    /// operator on a later condition is treated as `AND`; the operator on the
    /// first condition is ignored. Returns `None` for an empty list.
    pub fn from_conditions(conditions: &[Condition]) -> Option<MatchExpr> {
        let (first, rest) = conditions.split_first()?;
        let mut expr = MatchExpr::Leaf(first.clone());

        for condition in rest {
            let leaf = MatchExpr::Leaf(condition.clone());
            let op = condition.logical_operator.unwrap_or(LogicalOperator::And);
            expr = match (op, expr) {
                (LogicalOperator::And, MatchExpr::And(mut children)) => {
                    children.push(leaf);
                    MatchExpr::And(children)
                }
                (LogicalOperator::Or, MatchExpr::Or(mut children)) => {
                    children.push(leaf);
                    MatchExpr::Or(children)
                }
                (LogicalOperator::And, prev) => MatchExpr::And(vec![prev, leaf]),
                (LogicalOperator::Or, prev) => MatchExpr::Or(vec![prev, leaf]),
            };
        }

        Some(expr)
    }

    /// All leaf conditions in left-to-right order.
    pub fn leaves(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            MatchExpr::Leaf(c) => out.push(c),
            MatchExpr::And(children) | MatchExpr::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Nesting depth; a lone leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            MatchExpr::Leaf(_) => 1,
            MatchExpr::And(children) | MatchExpr::Or(children) => {
                1 + children.iter().map(MatchExpr::depth).max().unwrap_or(0)
            }
        }
    }
}

impl std::fmt::Display for MatchExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchExpr::Leaf(c) => write!(f, "{} {} {}", c.field, c.operator, c.value),
            MatchExpr::And(children) | MatchExpr::Or(children) => {
                let sep = if matches!(self, MatchExpr::And(_)) { " AND " } else { " OR " };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
