//! Rule schema types with serde (de)serialization.
//!
//! Defines the complete type hierarchy for alert rules:
//! - `RuleDefinition`: caller-supplied input (API body or YAML file)
//! - `Rule`: a validated, registered rule with a compiled match expression
//! - `Condition` / `MatchExpr`: field comparisons and the boolean tree over them
//! - `AlertTemplate`: what an alert raised by the rule looks like

mod condition;
mod expression;
mod rule;
mod template;

pub use condition::*;
pub use expression::*;
pub use rule::*;
pub use template::*;
