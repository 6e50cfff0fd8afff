//! HTTP handlers, grouped by resource.

pub mod alerts;
pub mod events;
pub mod health;
pub mod rules;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use chainwatch_alerts::AlertError;
use chainwatch_rules::RuleError;

/// Error type shared by all handlers.
#[derive(Debug)]
pub enum ApiError {
    Rule(RuleError),
    Alert(AlertError),
    BadRequest(String),
}

impl From<RuleError> for ApiError {
    fn from(e: RuleError) -> Self {
        Self::Rule(e)
    }
}

impl From<AlertError> for ApiError {
    fn from(e: AlertError) -> Self {
        Self::Alert(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Rule(RuleError::Validation(result)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "validation": result }),
            ),
            ApiError::Rule(e @ RuleError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, json!({ "error": e.to_string() }))
            }
            ApiError::Rule(e @ RuleError::Duplicate(_)) => {
                (StatusCode::CONFLICT, json!({ "error": e.to_string() }))
            }
            ApiError::Rule(e @ RuleError::Parse(_)) => {
                (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
            }
            ApiError::Rule(e @ RuleError::Io(_)) => {
                warn!(error = %e, "rule storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
            }
            ApiError::Alert(e @ AlertError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, json!({ "error": e.to_string() }))
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
        };
        (status, Json(body)).into_response()
    }
}
