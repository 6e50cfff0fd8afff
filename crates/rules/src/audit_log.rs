//! In-memory structured audit trail of rule activity.
//!
//! Evaluation faults, cooldown suppressions, alert creation and dispatch
//! outcomes are recorded per rule, capped at a configurable maximum (default
//! 500) with FIFO eviction. Uses `std::sync::RwLock` so it can be written from
//! the synchronous engine and from async dispatch tasks alike.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of entries kept per rule.
pub const DEFAULT_MAX_ENTRIES_PER_RULE: usize = 500;

/// Default number of entries returned by a query.
const DEFAULT_QUERY_LIMIT: usize = 100;

/// Severity level for audit log entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// What the rule was doing when the entry was written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Evaluation,
    Cooldown,
    Fault,
    AutoDisable,
    AlertCreated,
    Dispatch,
    DispatchFailure,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub rule_id: String,
    pub level: LogLevel,
    pub phase: ExecutionPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Query parameters for filtering audit log entries.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    /// Minimum log level (inclusive).
    pub level: Option<LogLevel>,
    pub phase: Option<ExecutionPhase>,
    /// Maximum number of entries to return (default 100).
    pub limit: Option<u32>,
    /// Only return entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

/// Per-rule audit log with FIFO eviction.
pub struct AuditLog {
    entries: RwLock<HashMap<String, VecDeque<LogEntry>>>,
    max_entries_per_rule: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES_PER_RULE)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries_per_rule: max.max(1),
        }
    }

    pub fn log(
        &self,
        rule_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
    ) {
        self.log_with_details(rule_id, level, phase, message, None, None);
    }

    /// Append an entry with optional structured details and duration.
    pub fn log_with_details(
        &self,
        rule_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        duration_ms: Option<u64>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            rule_id: rule_id.to_string(),
            level,
            phase,
            message: message.into(),
            details,
            duration_ms,
        };

        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        let deque = guard.entry(rule_id.to_string()).or_default();
        Self::push_bounded(deque, entry, self.max_entries_per_rule);
    }

    /// Like [`log_with_details`](Self::log_with_details), but only for a rule
    /// that already has entries. Returns `false` when the rule is unknown, e.g.
    /// cleared by a delete while background work was still reporting on it.
    pub fn append_existing(
        &self,
        rule_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        duration_ms: Option<u64>,
    ) -> bool {
        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        let Some(deque) = guard.get_mut(rule_id) else {
            return false;
        };
        let entry = LogEntry {
            timestamp: Utc::now(),
            rule_id: rule_id.to_string(),
            level,
            phase,
            message: message.into(),
            details,
            duration_ms,
        };
        Self::push_bounded(deque, entry, self.max_entries_per_rule);
        true
    }

    fn push_bounded(deque: &mut VecDeque<LogEntry>, entry: LogEntry, max: usize) {
        deque.push_back(entry);
        while deque.len() > max {
            deque.pop_front();
        }
    }

    /// Entries for a rule matching `params`, newest first.
    pub fn query(&self, rule_id: &str, params: &LogQueryParams) -> Vec<LogEntry> {
        let guard = self.entries.read().expect("audit_log lock poisoned");
        let Some(deque) = guard.get(rule_id) else {
            return Vec::new();
        };

        let limit = params
            .limit
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_QUERY_LIMIT);

        deque
            .iter()
            .rev()
            .filter(|e| params.level.map_or(true, |min| e.level >= min))
            .filter(|e| params.phase.map_or(true, |p| e.phase == p))
            .filter(|e| params.since.map_or(true, |s| e.timestamp >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop all entries for a rule.
    pub fn clear(&self, rule_id: &str) {
        self.entries
            .write()
            .expect("audit_log lock poisoned")
            .remove(rule_id);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
