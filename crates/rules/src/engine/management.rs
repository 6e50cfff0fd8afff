//! Rule CRUD on the engine. Validation errors surface synchronously; a
//! rejected definition leaves the registry untouched.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, RuleError};
use crate::schema::{Rule, RuleDefinition};
use crate::validation::{validate_definition, ValidationResult};

use super::RuleEngine;

impl RuleEngine {
    /// Validate and register a new rule. It starts enabled with no trigger
    /// history.
    pub fn create_rule(&self, definition: RuleDefinition) -> Result<Rule> {
        check(&definition)?;

        let id = definition
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let rule = Rule::from_definition(id, definition, Utc::now()).ok_or_else(no_conditions)?;
        let rule = self.registry.insert(rule)?;

        info!(rule_id = %rule.id, name = %rule.name, priority = rule.priority, "rule created");
        Ok(self.with_trigger_state(&rule))
    }

    /// Replace a rule's definition. Id, enablement, creation time and
    /// cooldown state are kept.
    pub fn update_rule(&self, id: &str, definition: RuleDefinition) -> Result<Rule> {
        if let Some(new_id) = definition.id.as_deref().filter(|new_id| *new_id != id) {
            let mut result = ValidationResult::new();
            result.error("id", format!("id cannot be changed (from '{id}' to '{new_id}')"));
            return Err(RuleError::Validation(result));
        }
        check(&definition)?;

        let existing = self
            .registry
            .get(id)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
        let mut replacement = Rule::from_definition(id.to_string(), definition, existing.created_at)
            .ok_or_else(no_conditions)?;
        replacement.updated_at = Utc::now();

        // `enabled` comes from the stored rule, read under the registry write.
        let rule = self.registry.update(id, |r| {
            replacement.enabled = r.enabled;
            *r = replacement;
        })?;
        self.clear_faults(id);
        info!(rule_id = %id, "rule updated");
        Ok(self.with_trigger_state(&rule))
    }

    /// Set a rule's enabled flag. Setting the current value is a no-op.
    pub fn toggle_rule(&self, id: &str, enabled: bool) -> Result<Rule> {
        let current = self
            .registry
            .get(id)
            .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
        if current.enabled == enabled {
            return Ok(self.with_trigger_state(&current));
        }

        let rule = self.registry.update(id, |r| {
            r.enabled = enabled;
            r.updated_at = Utc::now();
        })?;
        if enabled {
            self.clear_faults(id);
        }
        info!(rule_id = %id, enabled, "rule toggled");
        Ok(self.with_trigger_state(&rule))
    }

    /// Remove a rule and its cooldown, fault and audit state. Alerts it
    /// already raised are not affected.
    pub fn delete_rule(&self, id: &str) -> Result<Rule> {
        let rule = self.registry.remove(id)?;
        let removed = self.with_trigger_state(&rule);
        self.cooldowns.forget(id);
        self.clear_faults(id);
        self.audit.clear(id);
        info!(rule_id = %id, "rule deleted");
        Ok(removed)
    }

    pub fn get_rule(&self, id: &str) -> Option<Rule> {
        self.registry.get(id).map(|r| self.with_trigger_state(&r))
    }

    /// All rules in evaluation order.
    pub fn list_rules(&self) -> Vec<Rule> {
        self.registry
            .snapshot()
            .iter()
            .map(|r| self.with_trigger_state(r))
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.registry.len()
    }

    fn with_trigger_state(&self, rule: &Arc<Rule>) -> Rule {
        let mut rule = (**rule).clone();
        rule.last_triggered_at = self.cooldowns.last_triggered(&rule.id);
        rule
    }
}

fn check(definition: &RuleDefinition) -> Result<()> {
    let result = validate_definition(definition);
    if result.valid {
        Ok(())
    } else {
        Err(RuleError::Validation(result))
    }
}

fn no_conditions() -> RuleError {
    let mut result = ValidationResult::new();
    result.error("conditions", "rule must have at least one condition");
    RuleError::Validation(result)
}
