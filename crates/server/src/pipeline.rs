//! Process-wide wiring: event → rule engine → alert store → dispatcher.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;

use chainwatch_alerts::{Alert, AlertError, AlertId, AlertStore};
use chainwatch_core::{Config, Event};
use chainwatch_notify::{
    ActionDispatcher, DeliveryReport, LogNotifier, NotifyError, TemplateRenderer, WebhookNotifier,
};
use chainwatch_rules::audit_log::{AuditLog, ExecutionPhase, LogLevel};
use chainwatch_rules::RuleEngine;

/// Handler ref served by [`LogNotifier`].
pub const LOG_HANDLER: &str = "log";
/// Handler ref served by the configured webhook, if any.
pub const WEBHOOK_HANDLER: &str = "webhook";

/// What happened to one submitted event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub alerts: Vec<Alert>,
    pub evaluated: usize,
    pub suppressed: Vec<String>,
    pub faulted: Vec<String>,
}

pub struct AlertPipeline {
    engine: Arc<RuleEngine>,
    store: Arc<AlertStore>,
    dispatcher: Arc<ActionDispatcher>,
}

impl AlertPipeline {
    pub fn new(engine: Arc<RuleEngine>, store: Arc<AlertStore>, dispatcher: Arc<ActionDispatcher>) -> Self {
        Self {
            engine,
            store,
            dispatcher,
        }
    }

    /// Build the engine, store, and dispatcher from config, sharing one
    /// audit log. Registers the `log` channel, plus `webhook` when
    /// `WEBHOOK_URL` is set.
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        let audit = Arc::new(AuditLog::with_max_entries(config.audit.max_entries_per_rule));
        let engine = RuleEngine::new(&config.rules).with_audit_log(Arc::clone(&audit));
        let dispatcher = ActionDispatcher::new(config.dispatch.clone()).with_audit_log(audit);

        let renderer = Arc::new(TemplateRenderer::new());
        dispatcher.register(LOG_HANDLER, Arc::new(LogNotifier::new(Arc::clone(&renderer))));
        if let Some(url) = &config.channels.webhook_url {
            let webhook = WebhookNotifier::from_config(url.clone(), None, None, None, renderer)?;
            dispatcher.register(WEBHOOK_HANDLER, Arc::new(webhook));
        }

        Ok(Self::new(
            Arc::new(engine),
            Arc::new(AlertStore::new()),
            Arc::new(dispatcher),
        ))
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn store(&self) -> &AlertStore {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    /// Run an event through the engine and materialize its alerts.
    ///
    /// Returns once the alerts are stored; their actions are dispatched in
    /// the background. Must be called inside a tokio runtime.
    pub fn submit_event(&self, event: &Event) -> SubmitOutcome {
        let outcome = self.engine.process(event, Utc::now());

        let mut alerts = Vec::with_capacity(outcome.requests.len());
        for request in outcome.requests {
            let alert = self.store.create(request);
            self.engine.audit_log().log_with_details(
                &alert.rule_id,
                LogLevel::Info,
                ExecutionPhase::AlertCreated,
                format!("alert '{}' created", alert.title),
                Some(json!({ "alertId": alert.id, "eventId": alert.event_id })),
                None,
            );
            if !alert.actions.is_empty() {
                // Detached: delivery outcomes land in the audit log.
                drop(self.dispatch(alert.clone()));
            }
            alerts.push(alert);
        }

        if !alerts.is_empty() {
            info!(event_id = %event.id, event_type = %event.event_type, alerts = alerts.len(), "event raised alerts");
        }

        SubmitOutcome {
            alerts,
            evaluated: outcome.evaluated,
            suppressed: outcome.suppressed,
            faulted: outcome.faulted,
        }
    }

    /// Start background dispatch for a stored alert.
    ///
    /// The cancel handle is registered before the alert is re-read, so a
    /// concurrent dismiss is seen either here or by [`Self::dismiss`].
    fn dispatch(&self, alert: Alert) -> JoinHandle<Vec<DeliveryReport>> {
        let id = alert.id;
        let handle = self.dispatcher.spawn(alert);
        if self.store.get(id).map_or(true, |a| !a.is_active) {
            self.dispatcher.cancel(id);
        }
        handle
    }

    /// Dismiss an alert and cancel whatever of its dispatch is still pending.
    pub fn dismiss(&self, id: AlertId) -> Result<Alert, AlertError> {
        let alert = self.store.dismiss(id, Utc::now())?;
        self.dispatcher.cancel(id);
        Ok(alert)
    }
}
