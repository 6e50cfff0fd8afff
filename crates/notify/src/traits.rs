//! Notifier trait definition and shared error types.

use chrono::Utc;
use uuid::Uuid;

use chainwatch_alerts::AlertSummary;
use chainwatch_rules::schema::{ActionKind, AlertAction, AlertType, RuleCategory};

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel call timed out after {0}ms")]
    Timeout(u64),

    /// The channel accepted the call but reported a failure.
    #[error("Channel error: {0}")]
    Channel(String),
}

/// A notification channel (webhook, chat, email gateway, ...).
///
/// Channels are opaque to the engine: the dispatcher resolves an action's
/// `handler_ref` to a registered `Notifier` and calls [`send`](Notifier::send).
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert action through this channel.
    async fn send(&self, action: &AlertAction, alert: &AlertSummary) -> Result<(), NotifyError>;

    /// Test connectivity with a sample alert.
    async fn test(&self) -> Result<(), NotifyError> {
        let (action, alert) = sample_alert();
        self.send(&action, &alert).await
    }

    /// Human-readable name for this channel (e.g., "webhook", "log").
    fn channel_name(&self) -> &str;
}

/// Placeholder alert used by channel tests.
pub fn sample_alert() -> (AlertAction, AlertSummary) {
    let action = AlertAction {
        id: "test".to_string(),
        label: "Test notification".to_string(),
        kind: ActionKind::Secondary,
        handler_ref: "test".to_string(),
    };
    let alert = AlertSummary {
        id: Uuid::nil(),
        rule_id: "test-rule".to_string(),
        rule_name: "Test rule".to_string(),
        alert_type: AlertType::Info,
        category: RuleCategory::Custom,
        title: "[TEST] Chainwatch notification test".to_string(),
        description: "This is a test notification from chainwatch.".to_string(),
        severity_score: 0.0,
        confidence_score: 100.0,
        estimated_impact: 0.0,
        related_entity: None,
        tags: vec!["test".to_string()],
        timestamp: Utc::now(),
    };
    (action, alert)
}
