//! In-memory alert store.
//!
//! Each alert sits behind its own mutex so that lifecycle transitions on one
//! alert are linearizable while operations on different alerts proceed in
//! parallel. The outer map lock is only held for insertion and lookups.
//! Alerts are never removed; dismissed and expired alerts stay queryable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use chainwatch_rules::schema::AlertType;
use chainwatch_rules::AlertCreationRequest;

use crate::alert::{Alert, AlertId};
use crate::error::AlertError;
use crate::filter::AlertFilter;

type Entry = Arc<Mutex<Alert>>;

/// Headline numbers for dashboards.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertCounts {
    pub total: usize,
    pub active: usize,
    pub unread: usize,
    pub pinned: usize,
    pub critical: usize,
}

#[derive(Default)]
pub struct AlertStore {
    alerts: RwLock<HashMap<AlertId, Entry>>,
    next_seq: AtomicU64,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize an alert: fresh id, active, unread, unpinned.
    pub fn create(&self, request: AlertCreationRequest) -> Alert {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let alert = Alert::from_request(request, seq);
        info!(
            alert_id = %alert.id,
            rule_id = %alert.rule_id,
            alert_type = %alert.alert_type,
            "alert created"
        );
        self.alerts
            .write()
            .expect("alert store lock poisoned")
            .insert(alert.id, Arc::new(Mutex::new(alert.clone())));
        alert
    }

    pub fn get(&self, id: AlertId) -> Result<Alert, AlertError> {
        self.with_alert(id, |a| a.clone())
    }

    pub fn mark_read(&self, id: AlertId) -> Result<Alert, AlertError> {
        self.with_alert(id, |a| {
            a.is_read = true;
            a.clone()
        })
    }

    pub fn toggle_pin(&self, id: AlertId) -> Result<Alert, AlertError> {
        self.with_alert(id, |a| {
            a.is_pinned = !a.is_pinned;
            a.clone()
        })
    }

    /// Deactivate an alert. There is no inverse; dismissing twice keeps the
    /// first `dismissed_at`.
    pub fn dismiss(&self, id: AlertId, now: DateTime<Utc>) -> Result<Alert, AlertError> {
        self.with_alert(id, |a| {
            if a.dismissed_at.is_none() {
                a.is_active = false;
                a.dismissed_at = Some(now);
                debug!(alert_id = %id, "alert dismissed");
            }
            a.clone()
        })
    }

    /// Mark every unread alert read. Returns how many changed.
    pub fn mark_all_read(&self) -> usize {
        self.entries()
            .iter()
            .filter(|entry| {
                let mut a = entry.lock().expect("alert lock poisoned");
                !std::mem::replace(&mut a.is_read, true)
            })
            .count()
    }

    /// Alerts matching `filter`, newest first.
    pub fn query(&self, filter: &AlertFilter, now: DateTime<Utc>) -> Vec<Alert> {
        let mut out: Vec<Alert> = self
            .entries()
            .iter()
            .filter_map(|entry| {
                let a = entry.lock().expect("alert lock poisoned");
                filter.matches(&a, now).then(|| a.clone())
            })
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.seq.cmp(&a.seq)));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        out
    }

    /// Deactivate alerts whose expiry has passed. Queries already treat them
    /// as inactive; this only makes `is_active` reflect it.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let swept = self
            .entries()
            .iter()
            .filter(|entry| {
                let mut a = entry.lock().expect("alert lock poisoned");
                if a.is_active && a.is_expired(now) {
                    a.is_active = false;
                    true
                } else {
                    false
                }
            })
            .count();
        if swept > 0 {
            debug!(swept, "expired alerts deactivated");
        }
        swept
    }

    pub fn counts(&self, now: DateTime<Utc>) -> AlertCounts {
        let mut counts = AlertCounts::default();
        for entry in self.entries() {
            let a = entry.lock().expect("alert lock poisoned");
            counts.total += 1;
            if !a.is_live(now) {
                continue;
            }
            counts.active += 1;
            counts.unread += usize::from(!a.is_read);
            counts.pinned += usize::from(a.is_pinned);
            counts.critical += usize::from(a.alert_type == AlertType::Critical);
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.alerts.read().expect("alert store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_alert<T>(&self, id: AlertId, f: impl FnOnce(&mut Alert) -> T) -> Result<T, AlertError> {
        let entry = self
            .alerts
            .read()
            .expect("alert store lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(AlertError::NotFound(id))?;
        let mut alert = entry.lock().expect("alert lock poisoned");
        Ok(f(&mut alert))
    }

    /// Handles to every alert, taken without holding the map lock afterwards.
    fn entries(&self) -> Vec<Entry> {
        self.alerts
            .read()
            .expect("alert store lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}
