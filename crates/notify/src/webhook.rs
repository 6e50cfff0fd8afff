//! Generic HTTP webhook channel.
//!
//! Delivers alert actions as JSON payloads to a configured URL with optional
//! custom headers and a minijinja body template.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use chainwatch_alerts::AlertSummary;
use chainwatch_rules::schema::AlertAction;

use crate::templating::{TemplateContext, TemplateRenderer};
use crate::traits::{Notifier, NotifyError};

/// Default JSON body: rendered subject/body plus the raw action and alert.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    subject: String,
    body: String,
    action: &'a AlertAction,
    alert: &'a AlertSummary,
}

/// Delivers alert actions as JSON over HTTP to a configured endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL and header
/// values are resolved at construction time.
#[derive(Debug)]
pub struct WebhookNotifier {
    /// Target URL (env vars already resolved).
    url: String,
    method: reqwest::Method,
    /// Custom headers to include on every request.
    headers: HashMap<String, String>,
    /// When set, the rendered template is the request body; otherwise a
    /// [`WebhookPayload`] is serialized.
    body_template: Option<String>,
    renderer: Arc<TemplateRenderer>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier. `method` defaults to `POST`.
    ///
    /// Missing env vars and invalid body templates produce
    /// [`NotifyError::Config`].
    pub fn new(
        url: String,
        method: Option<reqwest::Method>,
        headers: HashMap<String, String>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let resolved_url = resolve_env_vars(&url)?;

        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        if let Some(ref tmpl) = body_template {
            renderer
                .validate(tmpl)
                .map_err(|e| NotifyError::Config(format!("invalid body template: {e}")))?;
        }

        Ok(Self {
            url: resolved_url,
            method: method.unwrap_or(reqwest::Method::POST),
            headers: resolved_headers,
            body_template,
            renderer,
            client: reqwest::Client::new(),
        })
    }

    /// Construct from config-level primitives; `method` is parsed
    /// case-insensitively.
    pub fn from_config(
        url: String,
        method: Option<String>,
        headers: Option<HashMap<String, String>>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let parsed_method = match method {
            Some(m) => {
                let upper = m.to_uppercase();
                upper
                    .parse::<reqwest::Method>()
                    .map(Some)
                    .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))?
            }
            None => None,
        };

        Self::new(
            url,
            parsed_method,
            headers.unwrap_or_default(),
            body_template,
            renderer,
        )
    }

    fn build_body(&self, action: &AlertAction, alert: &AlertSummary) -> Result<String, NotifyError> {
        let ctx = TemplateContext::new(action, alert);
        if let Some(tmpl) = &self.body_template {
            return self.renderer.render(tmpl, &ctx);
        }
        let message = self.renderer.render_default(&ctx)?;
        let payload = WebhookPayload {
            subject: message.subject,
            body: message.body,
            action,
            alert,
        };
        serde_json::to_string(&payload)
            .map_err(|e| NotifyError::Config(format!("failed to serialize payload: {e}")))
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, action: &AlertAction, alert: &AlertSummary) -> Result<(), NotifyError> {
        let body = self.build_body(action, alert)?;

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Channel(format!(
                "webhook returned {status}: {body_text}"
            )));
        }

        tracing::debug!(
            url = %self.url,
            alert_id = %alert.id,
            action_id = %action.id,
            %status,
            "webhook notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            // Consume the '{'
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name).map_err(|_| {
                NotifyError::Config(format!("env var not found: {var_name}"))
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::sample_alert;

    fn notifier(body_template: Option<&str>) -> Result<WebhookNotifier, NotifyError> {
        WebhookNotifier::from_config(
            "https://example.com/hook".into(),
            None,
            None,
            body_template.map(String::from),
            Arc::new(TemplateRenderer::new()),
        )
    }

    #[test]
    fn resolve_env_vars_substitutes() {
        std::env::set_var("CW_WEBHOOK_TEST_HOST", "example.com");
        let result = resolve_env_vars("https://${CW_WEBHOOK_TEST_HOST}/hook").unwrap();
        assert_eq!(result, "https://example.com/hook");
        std::env::remove_var("CW_WEBHOOK_TEST_HOST");

        assert_eq!(resolve_env_vars("https://plain/hook").unwrap(), "https://plain/hook");
    }

    #[test]
    fn resolve_env_vars_errors() {
        match resolve_env_vars("https://${ABSOLUTELY_NOT_SET_12345}/hook") {
            Err(NotifyError::Config(msg)) => assert!(msg.contains("ABSOLUTELY_NOT_SET_12345")),
            other => panic!("expected Config error, got: {other:?}"),
        }
        match resolve_env_vars("https://${UNCLOSED/hook") {
            Err(NotifyError::Config(msg)) => assert!(msg.contains("unclosed")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn from_config_methods() {
        assert_eq!(notifier(None).unwrap().method, reqwest::Method::POST);

        let renderer = Arc::new(TemplateRenderer::new());
        let put = WebhookNotifier::from_config(
            "https://example.com".into(),
            Some("put".into()),
            None,
            None,
            Arc::clone(&renderer),
        )
        .unwrap();
        assert_eq!(put.method, reqwest::Method::PUT);

        let bad = WebhookNotifier::from_config(
            "https://example.com".into(),
            Some("NOT_A_METHOD\0".into()),
            None,
            None,
            renderer,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn from_config_with_headers() {
        std::env::set_var("CW_WEBHOOK_API_KEY", "secret-key-123");
        let headers = HashMap::from([
            ("X-Api-Key".to_string(), "${CW_WEBHOOK_API_KEY}".to_string()),
            ("X-Static".to_string(), "fixed-value".to_string()),
        ]);
        let n = WebhookNotifier::from_config(
            "https://example.com".into(),
            None,
            Some(headers),
            None,
            Arc::new(TemplateRenderer::new()),
        )
        .unwrap();
        assert_eq!(n.headers["X-Api-Key"], "secret-key-123");
        assert_eq!(n.headers["X-Static"], "fixed-value");
        std::env::remove_var("CW_WEBHOOK_API_KEY");
    }

    #[test]
    fn invalid_body_template_is_config_error() {
        match notifier(Some("{{ unclosed")) {
            Err(NotifyError::Config(msg)) => assert!(msg.contains("invalid body template")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn default_body_is_json_payload() {
        let (action, alert) = sample_alert();
        let body = notifier(None).unwrap().build_body(&action, &alert).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["action"]["handlerRef"], "test");
        assert_eq!(json["alert"]["ruleId"], "test-rule");
        assert!(json["subject"].as_str().unwrap().starts_with("[INFO]"));
    }

    #[test]
    fn body_template_overrides_payload() {
        let (action, alert) = sample_alert();
        let n = notifier(Some(r#"{"text": "{{ alert.title }}"}"#)).unwrap();
        let body = n.build_body(&action, &alert).unwrap();
        assert_eq!(body, r#"{"text": "[TEST] Chainwatch notification test"}"#);
        assert_eq!(n.channel_name(), "webhook");
    }
}
