//! Rule definitions and registered rules.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AlertTemplate, AlertType, Condition, MatchExpr};

/// Functional area a rule belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Security,
    Trading,
    Whale,
    Defi,
    Arbitrage,
    Risk,
    Pattern,
    Custom,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Security => "security",
            RuleCategory::Trading => "trading",
            RuleCategory::Whale => "whale",
            RuleCategory::Defi => "defi",
            RuleCategory::Arbitrage => "arbitrage",
            RuleCategory::Risk => "risk",
            RuleCategory::Pattern => "pattern",
            RuleCategory::Custom => "custom",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied rule input, from the HTTP API or a YAML file.
///
/// Exactly one of `conditions` (flat list, per-condition AND/OR) or `match`
/// (explicit expression tree) must be given. `cooldown_minutes` is signed so
/// that negative input is reported by validation instead of failing to parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    /// Stable id (kebab-case). Generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: RuleCategory,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, rename = "match")]
    pub expression: Option<MatchExpr>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub cooldown_minutes: i64,
    #[serde(default)]
    pub alert: AlertTemplate,
}

/// A validated rule held by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: RuleCategory,
    /// Leaf conditions in order, as supplied.
    pub conditions: Vec<Condition>,
    /// Compiled match logic; the only thing evaluation looks at.
    pub expression: MatchExpr,
    pub priority: i32,
    pub cooldown_minutes: u32,
    pub enabled: bool,
    /// Filled in from the cooldown tracker when the rule is read.
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub alert: AlertTemplate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Build a rule from a definition that already passed validation.
    ///
    /// Returns `None` only if the definition carries no conditions at all,
    /// which validation rejects.
    pub(crate) fn from_definition(
        id: String,
        definition: RuleDefinition,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let (conditions, expression) = match definition.expression {
            Some(expr) => {
                let leaves = expr
                    .leaves()
                    .into_iter()
                    .map(|c| Condition {
                        logical_operator: None,
                        ..c.clone()
                    })
                    .collect();
                (leaves, expr)
            }
            None => {
                let expr = MatchExpr::from_conditions(&definition.conditions)?;
                (definition.conditions, expr)
            }
        };

        Some(Self {
            id,
            name: definition.name,
            description: definition.description,
            category: definition.category,
            conditions,
            expression,
            priority: definition.priority,
            cooldown_minutes: definition.cooldown_minutes.clamp(0, u32::MAX as i64) as u32,
            enabled: true,
            last_triggered_at: None,
            alert: definition.alert,
            created_at: now,
            updated_at: now,
        })
    }

    /// Suppression window after a trigger.
    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes as i64)
    }

    /// Severity class of alerts raised by this rule.
    pub fn alert_type(&self) -> AlertType {
        self.alert
            .alert_type
            .unwrap_or_else(|| AlertType::default_for(self.category))
    }
}
