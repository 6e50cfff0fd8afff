//! Routes alert actions to notification channels.
//!
//! Every action on an alert is delivered independently and concurrently:
//! a failing or slow channel never blocks its siblings or other alerts.
//! In-flight channel calls across all alerts are bounded by a semaphore,
//! each attempt runs under a timeout, and failed attempts are retried with
//! capped exponential backoff. Dismissing an alert cancels whatever part of
//! its dispatch has not completed yet; deliveries that already succeeded
//! stay delivered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use chainwatch_alerts::{Alert, AlertId, AlertSummary};
use chainwatch_core::config::DispatchConfig;
use chainwatch_rules::audit_log::{AuditLog, ExecutionPhase, LogLevel};
use chainwatch_rules::schema::AlertAction;

use crate::traits::{Notifier, NotifyError};

/// Terminal state of one action's delivery.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    /// Every attempt failed or timed out.
    Failed,
    /// The alert was dismissed before delivery completed.
    Cancelled,
    /// No channel is registered for the action's `handler_ref`.
    Unroutable,
}

/// Result of dispatching a single action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub alert_id: AlertId,
    pub action_id: String,
    pub handler_ref: String,
    pub status: DeliveryStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Delivers alert actions through registered channels.
pub struct ActionDispatcher {
    /// `handler_ref` → channel.
    channels: RwLock<HashMap<String, Arc<dyn Notifier>>>,
    permits: Arc<Semaphore>,
    config: DispatchConfig,
    /// Cancellation senders for alerts with dispatch in progress.
    pending: Mutex<HashMap<AlertId, watch::Sender<bool>>>,
    audit: Option<Arc<AuditLog>>,
}

impl ActionDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            pending: Mutex::new(HashMap::new()),
            audit: None,
        }
    }

    /// Record delivery outcomes in the rules' audit trail.
    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Register (or replace) the channel serving `handler_ref`.
    pub fn register(&self, handler_ref: impl Into<String>, channel: Arc<dyn Notifier>) {
        let handler_ref = handler_ref.into();
        tracing::info!(handler_ref = %handler_ref, channel = channel.channel_name(), "channel registered");
        self.channels
            .write()
            .expect("channel registry lock poisoned")
            .insert(handler_ref, channel);
    }

    /// Registered handler refs, sorted.
    pub fn handler_refs(&self) -> Vec<String> {
        let mut refs: Vec<String> = self
            .channels
            .read()
            .expect("channel registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        refs.sort();
        refs
    }

    fn channel(&self, handler_ref: &str) -> Option<Arc<dyn Notifier>> {
        self.channels
            .read()
            .expect("channel registry lock poisoned")
            .get(handler_ref)
            .cloned()
    }

    /// Send a test message through one channel.
    pub async fn test_channel(&self, handler_ref: &str) -> Result<(), NotifyError> {
        let channel = self
            .channel(handler_ref)
            .ok_or_else(|| NotifyError::Config(format!("No channel registered for '{handler_ref}'")))?;
        channel.test().await
    }

    /// Dispatch in the background. Returns immediately; the handle yields
    /// the per-action reports.
    pub fn spawn(self: &Arc<Self>, alert: Alert) -> JoinHandle<Vec<DeliveryReport>> {
        let cancel = self.track(alert.id);
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(&alert, cancel).await })
    }

    /// Dispatch every action of `alert` and wait for all of them.
    pub async fn dispatch(&self, alert: &Alert) -> Vec<DeliveryReport> {
        let cancel = self.track(alert.id);
        self.run(alert, cancel).await
    }

    /// Best-effort cancel of an alert's pending dispatch. Returns whether
    /// a dispatch was in progress.
    pub fn cancel(&self, alert_id: AlertId) -> bool {
        let pending = self.pending.lock().expect("pending dispatch lock poisoned");
        match pending.get(&alert_id) {
            Some(tx) => {
                tx.send_replace(true);
                tracing::debug!(alert_id = %alert_id, "dispatch cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Alerts with dispatch still in progress.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("pending dispatch lock poisoned").len()
    }

    fn track(&self, alert_id: AlertId) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        self.pending
            .lock()
            .expect("pending dispatch lock poisoned")
            .insert(alert_id, tx);
        rx
    }

    async fn run(&self, alert: &Alert, cancel: watch::Receiver<bool>) -> Vec<DeliveryReport> {
        let summary = alert.summary();
        let reports = join_all(
            alert
                .actions
                .iter()
                .map(|action| self.deliver(&summary, action, cancel.clone())),
        )
        .await;

        self.pending
            .lock()
            .expect("pending dispatch lock poisoned")
            .remove(&alert.id);

        for report in &reports {
            self.audit_report(&summary, report);
        }
        reports
    }

    async fn deliver(
        &self,
        alert: &AlertSummary,
        action: &AlertAction,
        mut cancel: watch::Receiver<bool>,
    ) -> DeliveryReport {
        let start = Instant::now();
        let mut attempts = 0u32;

        let (status, error) = match self.channel(&action.handler_ref) {
            None => (
                DeliveryStatus::Unroutable,
                Some(format!("no channel registered for '{}'", action.handler_ref)),
            ),
            Some(channel) => loop {
                if *cancel.borrow() {
                    break (DeliveryStatus::Cancelled, None);
                }

                let permit = tokio::select! {
                    p = Arc::clone(&self.permits).acquire_owned() => match p {
                        Ok(p) => p,
                        Err(_) => break (DeliveryStatus::Failed, Some("dispatcher closed".to_string())),
                    },
                    _ = cancelled(&mut cancel) => break (DeliveryStatus::Cancelled, None),
                };

                attempts += 1;
                let timeout = self.config.timeout();
                let result = tokio::select! {
                    r = tokio::time::timeout(timeout, channel.send(action, alert)) => {
                        r.unwrap_or_else(|_| Err(NotifyError::Timeout(self.config.timeout_ms)))
                    }
                    _ = cancelled(&mut cancel) => break (DeliveryStatus::Cancelled, None),
                };
                drop(permit);

                match result {
                    Ok(()) => break (DeliveryStatus::Delivered, None),
                    Err(e) if attempts >= self.config.max_attempts => {
                        break (DeliveryStatus::Failed, Some(e.to_string()));
                    }
                    Err(e) => {
                        let delay = self.config.backoff_for(attempts);
                        tracing::warn!(
                            alert_id = %alert.id,
                            handler_ref = %action.handler_ref,
                            attempt = attempts,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %e,
                            "channel call failed, retrying"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancelled(&mut cancel) => break (DeliveryStatus::Cancelled, None),
                        }
                    }
                }
            },
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match status {
            DeliveryStatus::Delivered => tracing::info!(
                alert_id = %alert.id,
                handler_ref = %action.handler_ref,
                attempts,
                duration_ms,
                "notification delivered"
            ),
            DeliveryStatus::Cancelled => tracing::info!(
                alert_id = %alert.id,
                handler_ref = %action.handler_ref,
                "notification cancelled"
            ),
            _ => tracing::warn!(
                alert_id = %alert.id,
                handler_ref = %action.handler_ref,
                attempts,
                error = error.as_deref().unwrap_or_default(),
                "notification delivery failed"
            ),
        }

        DeliveryReport {
            alert_id: alert.id,
            action_id: action.id.clone(),
            handler_ref: action.handler_ref.clone(),
            status,
            attempts,
            error,
            duration_ms,
        }
    }

    fn audit_report(&self, alert: &AlertSummary, report: &DeliveryReport) {
        let Some(audit) = &self.audit else {
            return;
        };
        let (level, phase) = match report.status {
            DeliveryStatus::Delivered => (LogLevel::Info, ExecutionPhase::Dispatch),
            DeliveryStatus::Cancelled => (LogLevel::Debug, ExecutionPhase::Dispatch),
            DeliveryStatus::Failed | DeliveryStatus::Unroutable => {
                (LogLevel::Error, ExecutionPhase::DispatchFailure)
            }
        };
        // A rule deleted mid-dispatch has had its log cleared; leave it gone.
        audit.append_existing(
            &alert.rule_id,
            level,
            phase,
            format!("action '{}' via '{}': {:?}", report.action_id, report.handler_ref, report.status),
            Some(json!({
                "alertId": report.alert_id,
                "attempts": report.attempts,
                "error": report.error,
            })),
            Some(report.duration_ms),
        );
    }
}

/// Resolves once cancellation is requested; never if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|c| *c).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chainwatch_alerts::AlertStore;
    use chainwatch_rules::schema::{ActionKind, AlertType, RuleCategory};
    use chainwatch_rules::scoring::AlertScores;
    use chainwatch_rules::AlertCreationRequest;
    use chrono::Utc;
    use uuid::Uuid;

    /// Fails the first `fail_first` calls, then succeeds after `delay`.
    struct MockNotifier {
        calls: Arc<AtomicUsize>,
        fail_first: usize,
        delay: Duration,
    }

    impl MockNotifier {
        fn new(calls: &Arc<AtomicUsize>) -> Self {
            Self {
                calls: Arc::clone(calls),
                fail_first: 0,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _action: &AlertAction, _alert: &AlertSummary) -> Result<(), NotifyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if n < self.fail_first {
                Err(NotifyError::Channel("mock failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn channel_name(&self) -> &str {
            "mock"
        }
    }

    fn config() -> DispatchConfig {
        DispatchConfig {
            max_concurrent: 4,
            timeout_ms: 1_000,
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
        }
    }

    fn action(id: &str, handler_ref: &str) -> AlertAction {
        AlertAction {
            id: id.to_string(),
            label: id.to_string(),
            kind: ActionKind::Primary,
            handler_ref: handler_ref.to_string(),
        }
    }

    fn alert(actions: Vec<AlertAction>) -> Alert {
        AlertStore::new().create(AlertCreationRequest {
            rule_id: "whale".into(),
            rule_name: "Whale".into(),
            alert_type: AlertType::High,
            category: RuleCategory::Whale,
            title: "Whale transfer".into(),
            description: "Large transfer".into(),
            scores: AlertScores {
                severity_score: 80.0,
                confidence_score: 70.0,
                estimated_impact: 80.0,
            },
            tags: vec![],
            related_entity: None,
            actions,
            triggered_at: Utc::now(),
            expires_at: None,
            event_id: Uuid::new_v4(),
            event_type: "whale_transfer".into(),
        })
    }

    #[tokio::test]
    async fn delivers_every_action() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = ActionDispatcher::new(config());
        d.register("a", Arc::new(MockNotifier::new(&calls)));
        d.register("b", Arc::new(MockNotifier::new(&calls)));

        let reports = d.dispatch(&alert(vec![action("x", "a"), action("y", "b")])).await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.status == DeliveryStatus::Delivered && r.attempts == 1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(d.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = ActionDispatcher::new(config());
        d.register(
            "flaky",
            Arc::new(MockNotifier {
                fail_first: 2,
                ..MockNotifier::new(&calls)
            }),
        );

        let reports = d.dispatch(&alert(vec![action("x", "flaky")])).await;
        assert_eq!(reports[0].status, DeliveryStatus::Delivered);
        assert_eq!(reports[0].attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_isolated_per_action() {
        let ok_calls = Arc::new(AtomicUsize::new(0));
        let bad_calls = Arc::new(AtomicUsize::new(0));
        let audit = Arc::new(AuditLog::new());
        audit.log("whale", LogLevel::Info, ExecutionPhase::AlertCreated, "alert raised");
        let d = ActionDispatcher::new(config()).with_audit_log(Arc::clone(&audit));
        d.register("ok", Arc::new(MockNotifier::new(&ok_calls)));
        d.register(
            "broken",
            Arc::new(MockNotifier {
                fail_first: usize::MAX,
                ..MockNotifier::new(&bad_calls)
            }),
        );

        let reports = d
            .dispatch(&alert(vec![action("x", "broken"), action("y", "ok"), action("z", "missing")]))
            .await;

        assert_eq!(reports[0].status, DeliveryStatus::Failed);
        assert_eq!(reports[0].attempts, 3);
        assert!(reports[0].error.as_deref().unwrap().contains("mock failure"));
        assert_eq!(reports[1].status, DeliveryStatus::Delivered);
        assert_eq!(reports[2].status, DeliveryStatus::Unroutable);
        assert_eq!(reports[2].attempts, 0);
        assert_eq!(bad_calls.load(Ordering::SeqCst), 3);

        let failures = audit.query(
            "whale",
            &chainwatch_rules::audit_log::LogQueryParams {
                phase: Some(ExecutionPhase::DispatchFailure),
                ..Default::default()
            },
        );
        assert_eq!(failures.len(), 2);
    }

    #[tokio::test]
    async fn deleted_rule_log_stays_cleared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let audit = Arc::new(AuditLog::new());
        audit.log("whale", LogLevel::Info, ExecutionPhase::AlertCreated, "alert raised");
        let d = ActionDispatcher::new(config()).with_audit_log(Arc::clone(&audit));
        d.register("a", Arc::new(MockNotifier::new(&calls)));

        let a = alert(vec![action("x", "a")]);
        d.dispatch(&a).await;
        let all = chainwatch_rules::audit_log::LogQueryParams::default();
        assert_eq!(audit.query("whale", &all).len(), 2);

        // Rule deleted; a later report for its alert must not revive the log.
        audit.clear("whale");
        let reports = d.dispatch(&a).await;
        assert_eq!(reports[0].status, DeliveryStatus::Delivered);
        assert!(audit.query("whale", &all).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_channel_times_out() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = ActionDispatcher::new(DispatchConfig {
            max_attempts: 2,
            ..config()
        });
        d.register(
            "slow",
            Arc::new(MockNotifier {
                delay: Duration::from_secs(30),
                ..MockNotifier::new(&calls)
            }),
        );

        let reports = d.dispatch(&alert(vec![action("x", "slow")])).await;
        assert_eq!(reports[0].status, DeliveryStatus::Failed);
        assert_eq!(reports[0].attempts, 2);
        assert!(reports[0].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_pending_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = Arc::new(ActionDispatcher::new(config()));
        d.register(
            "slow",
            Arc::new(MockNotifier {
                delay: Duration::from_millis(500),
                ..MockNotifier::new(&calls)
            }),
        );

        let a = alert(vec![action("x", "slow")]);
        let handle = d.spawn(a.clone());
        assert_eq!(d.pending_count(), 1);
        assert!(d.cancel(a.id));

        let reports = handle.await.unwrap();
        assert_eq!(reports[0].status, DeliveryStatus::Cancelled);
        assert_eq!(d.pending_count(), 0);
        assert!(!d.cancel(a.id));
    }

    #[tokio::test]
    async fn cancel_does_not_undo_delivery() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = Arc::new(ActionDispatcher::new(config()));
        d.register("fast", Arc::new(MockNotifier::new(&calls)));

        let a = alert(vec![action("x", "fast")]);
        let reports = d.spawn(a.clone()).await.unwrap();
        assert_eq!(reports[0].status, DeliveryStatus::Delivered);
        assert!(!d.cancel(a.id));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        struct Gauge {
            current: AtomicUsize,
            peak: AtomicUsize,
        }
        struct GaugedNotifier(Arc<Gauge>);

        #[async_trait::async_trait]
        impl Notifier for GaugedNotifier {
            async fn send(&self, _: &AlertAction, _: &AlertSummary) -> Result<(), NotifyError> {
                let now = self.0.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.0.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.0.current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
            fn channel_name(&self) -> &str {
                "gauged"
            }
        }

        let gauge = Arc::new(Gauge {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let d = Arc::new(ActionDispatcher::new(DispatchConfig {
            max_concurrent: 2,
            ..config()
        }));
        d.register("g", Arc::new(GaugedNotifier(Arc::clone(&gauge))));

        let handles: Vec<_> = (0..5)
            .map(|i| d.spawn(alert(vec![action(&format!("a{i}"), "g"), action("b", "g")])))
            .collect();
        for h in handles {
            assert!(h.await.unwrap().iter().all(|r| r.status == DeliveryStatus::Delivered));
        }
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_channel_requires_registration() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = ActionDispatcher::new(config());
        d.register("mock", Arc::new(MockNotifier::new(&calls)));

        assert!(d.test_channel("mock").await.is_ok());
        assert!(matches!(d.test_channel("nope").await, Err(NotifyError::Config(_))));
        assert_eq!(d.handler_refs(), ["mock"]);
    }
}
