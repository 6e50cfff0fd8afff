//! Per-rule cooldown tracking.
//!
//! A rule that triggered at `last` is suppressed while `now - last < cooldown`.
//! [`CooldownTracker::try_trigger`] performs the check and the update under
//! one lock so that concurrent matching events for the same rule produce a
//! single trigger per window.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Last-trigger timestamps keyed by rule id.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_triggered: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left in the rule's cooldown window, or `None` if it may trigger.
    ///
    /// A zero cooldown never suppresses. A clock that moved backwards past
    /// the last trigger counts as still cooling down.
    pub fn remaining(&self, rule_id: &str, cooldown: Duration, now: DateTime<Utc>) -> Option<Duration> {
        let map = self.last_triggered.lock().expect("cooldown lock poisoned");
        remaining_in(&map, rule_id, cooldown, now)
    }

    /// Whether the rule is currently suppressed.
    pub fn should_suppress(&self, rule_id: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        self.remaining(rule_id, cooldown, now).is_some()
    }

    /// Record a trigger at `at` unconditionally.
    pub fn record_trigger(&self, rule_id: &str, at: DateTime<Utc>) {
        self.last_triggered
            .lock()
            .expect("cooldown lock poisoned")
            .insert(rule_id.to_string(), at);
    }

    /// Atomically check the cooldown and, if the rule is not suppressed,
    /// record a trigger at `now`. Returns whether the caller won the trigger.
    pub fn try_trigger(&self, rule_id: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        let mut map = self.last_triggered.lock().expect("cooldown lock poisoned");
        if let Some(left) = remaining_in(&map, rule_id, cooldown, now) {
            debug!(
                rule_id = %rule_id,
                "rule still in cooldown ({}s remaining)",
                left.num_seconds()
            );
            return false;
        }
        map.insert(rule_id.to_string(), now);
        true
    }

    pub fn last_triggered(&self, rule_id: &str) -> Option<DateTime<Utc>> {
        self.last_triggered
            .lock()
            .expect("cooldown lock poisoned")
            .get(rule_id)
            .copied()
    }

    /// Drop state for a deleted rule.
    pub fn forget(&self, rule_id: &str) {
        self.last_triggered
            .lock()
            .expect("cooldown lock poisoned")
            .remove(rule_id);
    }

    /// Number of rules that have triggered at least once.
    pub fn len(&self) -> usize {
        self.last_triggered.lock().expect("cooldown lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remaining_in(
    map: &HashMap<String, DateTime<Utc>>,
    rule_id: &str,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if cooldown <= Duration::zero() {
        return None;
    }
    let last = map.get(rule_id)?;
    let elapsed = now.signed_duration_since(*last);
    (elapsed < cooldown).then(|| cooldown - elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn fifteen_minute_window() {
        let tracker = CooldownTracker::new();
        let cooldown = Duration::minutes(15);

        assert!(tracker.try_trigger("whale", cooldown, t0()));
        assert!(!tracker.try_trigger("whale", cooldown, t0() + Duration::minutes(10)));
        assert!(tracker.try_trigger("whale", cooldown, t0() + Duration::minutes(16)));
        assert_eq!(tracker.last_triggered("whale"), Some(t0() + Duration::minutes(16)));
    }

    #[test]
    fn boundary_is_not_suppressed() {
        let tracker = CooldownTracker::new();
        let cooldown = Duration::minutes(15);
        tracker.record_trigger("r", t0());

        let just_before = t0() + cooldown - Duration::milliseconds(1);
        assert!(tracker.should_suppress("r", cooldown, just_before));
        assert!(!tracker.should_suppress("r", cooldown, t0() + cooldown));
    }

    #[test]
    fn repeated_checks_do_not_change_state() {
        let tracker = CooldownTracker::new();
        let cooldown = Duration::minutes(15);
        tracker.record_trigger("r", t0());

        for minute in [1, 1, 5, 10, 10, 14] {
            assert!(tracker.should_suppress("r", cooldown, t0() + Duration::minutes(minute)));
            assert_eq!(tracker.last_triggered("r"), Some(t0()));
        }
        for _ in 0..3 {
            assert!(!tracker.should_suppress("r", cooldown, t0() + Duration::minutes(16)));
        }
        assert_eq!(tracker.last_triggered("r"), Some(t0()));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn zero_cooldown_never_suppresses() {
        let tracker = CooldownTracker::new();
        for _ in 0..3 {
            assert!(tracker.try_trigger("r", Duration::zero(), t0()));
        }
    }

    #[test]
    fn remaining_reports_time_left() {
        let tracker = CooldownTracker::new();
        tracker.record_trigger("r", t0());
        let left = tracker.remaining("r", Duration::minutes(15), t0() + Duration::minutes(5));
        assert_eq!(left, Some(Duration::minutes(10)));
        assert_eq!(tracker.remaining("other", Duration::minutes(15), t0()), None);
    }

    #[test]
    fn rules_are_independent_and_forgettable() {
        let tracker = CooldownTracker::new();
        let cooldown = Duration::hours(1);
        assert!(tracker.try_trigger("a", cooldown, t0()));
        assert!(tracker.try_trigger("b", cooldown, t0()));
        assert_eq!(tracker.len(), 2);

        tracker.forget("a");
        assert!(tracker.last_triggered("a").is_none());
        assert!(tracker.try_trigger("a", cooldown, t0()));
        assert!(!tracker.try_trigger("b", cooldown, t0()));
    }

    #[test]
    fn concurrent_try_trigger_has_one_winner() {
        let tracker = Arc::new(CooldownTracker::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let now = t0();

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if tracker.try_trigger("whale", Duration::minutes(15), now) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
