//! Copy-on-write rule registry.
//!
//! Readers take an `Arc` snapshot of the whole rule list and evaluate against
//! it without holding any lock; writers clone the list, apply their change and
//! swap the snapshot in. The list is kept in evaluation order: priority
//! descending, then creation time, then id.

use std::sync::{Arc, RwLock};

use crate::error::{Result, RuleError};
use crate::schema::Rule;

/// Immutable view of the rule set at one point in time.
pub type RuleSnapshot = Arc<Vec<Arc<Rule>>>;

#[derive(Default)]
pub struct RuleRegistry {
    rules: RwLock<RuleSnapshot>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rule set in evaluation order.
    pub fn snapshot(&self) -> RuleSnapshot {
        let guard = self.rules.read().expect("rule registry lock poisoned");
        Arc::clone(&*guard)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Rule>> {
        self.snapshot().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a new rule. Fails if the id is taken.
    pub fn insert(&self, rule: Rule) -> Result<Arc<Rule>> {
        self.modify(|rules| {
            if rules.iter().any(|r| r.id == rule.id) {
                return Err(RuleError::Duplicate(rule.id.clone()));
            }
            let rule = Arc::new(rule);
            rules.push(Arc::clone(&rule));
            Ok(rule)
        })
    }

    /// Replace the rule with `id` by the result of `f` applied to a copy.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Rule)) -> Result<Arc<Rule>> {
        self.modify(|rules| {
            let slot = rules
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            let mut next = (**slot).clone();
            f(&mut next);
            *slot = Arc::new(next);
            Ok(Arc::clone(slot))
        })
    }

    pub fn remove(&self, id: &str) -> Result<Arc<Rule>> {
        self.modify(|rules| {
            let pos = rules
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            Ok(rules.remove(pos))
        })
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Vec<Arc<Rule>>) -> Result<T>) -> Result<T> {
        let mut guard = self.rules.write().expect("rule registry lock poisoned");
        let mut next: Vec<Arc<Rule>> = (**guard).clone();
        let out = f(&mut next)?;
        next.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        *guard = Arc::new(next);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ComparisonOperator, Condition, RuleCategory, RuleDefinition};
    use chrono::{Duration, Utc};

    fn rule(id: &str, priority: i32) -> Rule {
        let def = RuleDefinition {
            id: Some(id.into()),
            name: id.into(),
            description: None,
            category: RuleCategory::Custom,
            conditions: vec![Condition::new("apy", ComparisonOperator::Gt, 1)],
            expression: None,
            priority,
            cooldown_minutes: 0,
            alert: Default::default(),
        };
        Rule::from_definition(id.into(), def, Utc::now()).unwrap()
    }

    #[test]
    fn snapshot_is_priority_ordered() {
        let reg = RuleRegistry::new();
        reg.insert(rule("low", 1)).unwrap();
        reg.insert(rule("high", 90)).unwrap();
        reg.insert(rule("mid", 50)).unwrap();

        let ids: Vec<_> = reg.snapshot().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, ["high", "mid", "low"]);
    }

    #[test]
    fn ties_break_on_creation_time() {
        let reg = RuleRegistry::new();
        let mut later = rule("a-later", 5);
        later.created_at = later.created_at + Duration::seconds(10);
        reg.insert(later).unwrap();
        reg.insert(rule("b-earlier", 5)).unwrap();

        let ids: Vec<_> = reg.snapshot().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, ["b-earlier", "a-later"]);
    }

    #[test]
    fn duplicate_and_missing_ids() {
        let reg = RuleRegistry::new();
        reg.insert(rule("r", 0)).unwrap();
        assert!(matches!(reg.insert(rule("r", 0)), Err(RuleError::Duplicate(_))));
        assert!(matches!(reg.remove("nope"), Err(RuleError::NotFound(_))));
        assert!(matches!(reg.update("nope", |_| {}), Err(RuleError::NotFound(_))));
    }

    #[test]
    fn old_snapshot_is_unaffected_by_writes() {
        let reg = RuleRegistry::new();
        reg.insert(rule("r", 0)).unwrap();
        let before = reg.snapshot();

        reg.update("r", |r| r.enabled = false).unwrap();
        reg.insert(rule("s", 0)).unwrap();

        assert_eq!(before.len(), 1);
        assert!(before[0].enabled);
        assert!(!reg.get("r").unwrap().enabled);
        assert_eq!(reg.len(), 2);

        reg.remove("r").unwrap();
        assert!(reg.get("r").is_none());
    }
}
