//! Notification delivery for raised alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - Webhook and log channel implementations
//! - Minijinja template rendering for notification messages
//! - `ActionDispatcher`: bounded, retried, cancellable delivery of alert actions

pub mod dispatcher;
pub mod log;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatcher::{ActionDispatcher, DeliveryReport, DeliveryStatus};
pub use log::LogNotifier;
pub use templating::TemplateRenderer;
pub use traits::{Notifier, NotifyError};
pub use webhook::WebhookNotifier;
