//! Minijinja template rendering for notification messages.
//!
//! Templates see the alert summary as `alert` (camelCase keys, so
//! `alert.severityScore`), the triggering action as `action`, and the render
//! time as `now`. Templates are arbitrary strings, so a fresh
//! [`minijinja::Environment`] is created per render call.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use chainwatch_alerts::AlertSummary;
use chainwatch_rules::schema::AlertAction;

use crate::traits::NotifyError;

/// Default subject line for channels without their own template.
pub const DEFAULT_SUBJECT: &str = "[{{ alert.type | upper }}] {{ alert.title }}";

/// Default body for channels without their own template.
pub const DEFAULT_BODY: &str = "{{ alert.description }}\n\
severity {{ alert.severityScore | round }} / confidence {{ alert.confidenceScore | round }}\
{% if alert.relatedEntity %} / entity {{ alert.relatedEntity }}{% endif %}";

/// Context data available to notification templates.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext<'a> {
    pub alert: &'a AlertSummary,
    pub action: &'a AlertAction,
    /// Render time in RFC 3339.
    pub now: String,
}

impl<'a> TemplateContext<'a> {
    pub fn new(action: &'a AlertAction, alert: &'a AlertSummary) -> Self {
        Self {
            alert,
            action,
            now: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Subject and body rendered for one delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Renders notification templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_function("env", env_function);
        env
    }

    pub fn render(&self, template_str: &str, ctx: &TemplateContext<'_>) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Render the default subject and body.
    pub fn render_default(&self, ctx: &TemplateContext<'_>) -> Result<RenderedMessage, NotifyError> {
        Ok(RenderedMessage {
            subject: self.render(DEFAULT_SUBJECT, ctx)?,
            body: self.render(DEFAULT_BODY, ctx)?,
        })
    }

    /// Check template syntax without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

/// Round a float to N decimal places (default 0).
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Read an environment variable; empty string (and a warning) when unset.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}
