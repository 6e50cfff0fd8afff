//! Channel that writes alerts to the process log.

use std::sync::Arc;

use chainwatch_alerts::AlertSummary;
use chainwatch_rules::schema::AlertAction;

use crate::templating::{TemplateContext, TemplateRenderer};
use crate::traits::{Notifier, NotifyError};

/// Emits each delivery as a `tracing` event at INFO level. Useful as the
/// `log` handler in development and as an always-available fallback.
#[derive(Debug, Default)]
pub struct LogNotifier {
    renderer: Arc<TemplateRenderer>,
}

impl LogNotifier {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, action: &AlertAction, alert: &AlertSummary) -> Result<(), NotifyError> {
        let ctx = TemplateContext::new(action, alert);
        let message = self.renderer.render_default(&ctx)?;
        tracing::info!(
            alert_id = %alert.id,
            rule_id = %alert.rule_id,
            action_id = %action.id,
            subject = %message.subject,
            "{}",
            message.body
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_channel_always_succeeds() {
        let notifier = LogNotifier::default();
        assert!(notifier.test().await.is_ok());
        assert_eq!(notifier.channel_name(), "log");
    }
}
