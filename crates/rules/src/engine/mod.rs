//! The rule engine: evaluates every enabled rule against an event, applies
//! cooldown suppression and emits alert creation requests.
//!
//! Rules are evaluated in descending priority against a registry snapshot.
//! A rule whose conditions fault is isolated: the fault is logged and counted,
//! the remaining rules still run, and after `fault_threshold` consecutive
//! faults the rule is disabled.

mod management;
mod request;


pub use request::AlertCreationRequest;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use chainwatch_core::config::RulesConfig;
use chainwatch_core::Event;

use crate::audit_log::{AuditLog, ExecutionPhase, LogLevel};
use crate::cooldown::CooldownTracker;
use crate::evaluator::{EvalFault, RuleEvaluator};
use crate::registry::RuleRegistry;
use crate::schema::Rule;
use crate::scoring::{AlertScorer, EventFieldScorer};

/// Result of processing one event.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    /// Alerts to create, in rule priority order.
    pub requests: Vec<AlertCreationRequest>,
    /// Enabled rules evaluated.
    pub evaluated: usize,
    /// Rules that matched but were inside their cooldown window.
    pub suppressed: Vec<String>,
    /// Rules whose evaluation faulted.
    pub faulted: Vec<String>,
}

pub struct RuleEngine {
    registry: RuleRegistry,
    cooldowns: CooldownTracker,
    /// Consecutive fault counts; absent means zero.
    faults: Mutex<HashMap<String, u32>>,
    audit: Arc<AuditLog>,
    scorer: Arc<dyn AlertScorer>,
    fault_threshold: u32,
}

impl RuleEngine {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            registry: RuleRegistry::new(),
            cooldowns: CooldownTracker::new(),
            faults: Mutex::new(HashMap::new()),
            audit: Arc::new(AuditLog::new()),
            scorer: Arc::new(EventFieldScorer),
            fault_threshold: config.fault_threshold,
        }
    }

    /// Share an audit log with other components (e.g. the dispatcher).
    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn AlertScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Evaluate all enabled rules against `event` at instant `now`.
    ///
    /// Never fails: evaluation faults are isolated per rule and reported in
    /// the outcome and the audit log.
    pub fn process(&self, event: &Event, now: DateTime<Utc>) -> ProcessOutcome {
        let snapshot = self.registry.snapshot();
        let mut outcome = ProcessOutcome::default();

        for rule in snapshot.iter().filter(|r| r.enabled) {
            outcome.evaluated += 1;

            let matched = match RuleEvaluator::try_matches(rule, event) {
                Ok(matched) => {
                    self.clear_faults(&rule.id);
                    matched
                }
                Err(fault) => {
                    self.record_fault(rule, &fault);
                    outcome.faulted.push(rule.id.clone());
                    continue;
                }
            };

            if !matched {
                continue;
            }

            if !self.cooldowns.try_trigger(&rule.id, rule.cooldown(), now) {
                debug!(rule_id = %rule.id, event_id = %event.id, "match suppressed by cooldown");
                self.audit.log(
                    &rule.id,
                    LogLevel::Debug,
                    ExecutionPhase::Cooldown,
                    format!("{} event matched inside cooldown window", event.event_type),
                );
                outcome.suppressed.push(rule.id.clone());
                continue;
            }

            let scores = self.scorer.score(rule, event);
            let request = AlertCreationRequest::build(rule, event, scores, now);
            info!(
                rule_id = %rule.id,
                event_id = %event.id,
                alert_type = %request.alert_type,
                severity = request.scores.severity_score,
                "rule triggered"
            );
            self.audit.log_with_details(
                &rule.id,
                LogLevel::Info,
                ExecutionPhase::Evaluation,
                format!("matched {} event", event.event_type),
                Some(json!({ "eventId": event.id, "severityScore": request.scores.severity_score })),
                None,
            );
            outcome.requests.push(request);
        }

        outcome
    }

    fn clear_faults(&self, rule_id: &str) {
        let mut faults = self.faults.lock().expect("fault counter lock poisoned");
        faults.remove(rule_id);
    }

    fn record_fault(&self, rule: &Rule, fault: &EvalFault) {
        let count = {
            let mut faults = self.faults.lock().expect("fault counter lock poisoned");
            let count = faults.entry(rule.id.clone()).or_insert(0);
            *count += 1;
            *count
        };

        warn!(rule_id = %rule.id, consecutive = count, error = %fault, "rule evaluation fault");
        self.audit.log_with_details(
            &rule.id,
            LogLevel::Warning,
            ExecutionPhase::Fault,
            fault.to_string(),
            Some(json!({ "consecutiveFaults": count })),
            None,
        );

        if self.fault_threshold > 0 && count >= self.fault_threshold {
            if self.registry.update(&rule.id, |r| r.enabled = false).is_ok() {
                warn!(rule_id = %rule.id, faults = count, "rule auto-disabled after repeated faults");
                self.audit.log(
                    &rule.id,
                    LogLevel::Error,
                    ExecutionPhase::AutoDisable,
                    format!("disabled after {count} consecutive evaluation faults"),
                );
            }
        }
    }

    /// Consecutive faults recorded for a rule since its last clean evaluation.
    pub fn fault_count(&self, rule_id: &str) -> u32 {
        self.faults
            .lock()
            .expect("fault counter lock poisoned")
            .get(rule_id)
            .copied()
            .unwrap_or(0)
    }
}
