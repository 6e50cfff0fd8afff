//! Rule management endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use chainwatch_rules::audit_log::{LogEntry, LogQueryParams};
use chainwatch_rules::schema::{Rule, RuleDefinition};
use chainwatch_rules::RuleError;

use super::ApiError;
use crate::state::AppState;

/// Body of `POST /rules/{id}/toggle`.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

/// List all rules in evaluation order.
pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<Rule>> {
    Json(state.pipeline.engine().list_rules())
}

pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, ApiError> {
    state
        .pipeline
        .engine()
        .get_rule(&id)
        .map(Json)
        .ok_or_else(|| RuleError::NotFound(id).into())
}

/// Create a rule. Malformed definitions are rejected with the full
/// validation report.
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RuleDefinition>, JsonRejection>,
) -> Result<(StatusCode, Json<Rule>), ApiError> {
    let Json(definition) = body?;
    let rule = state.pipeline.engine().create_rule(definition)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Replace a rule's definition. Id, enabled flag and cooldown state are kept.
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<RuleDefinition>, JsonRejection>,
) -> Result<Json<Rule>, ApiError> {
    let Json(definition) = body?;
    Ok(Json(state.pipeline.engine().update_rule(&id, definition)?))
}

pub async fn toggle_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<Rule>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.pipeline.engine().toggle_rule(&id, request.enabled)?))
}

/// Remove a rule. Alerts it already raised are kept.
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.engine().delete_rule(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Audit trail for one rule, newest first.
pub async fn rule_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let engine = state.pipeline.engine();
    if engine.get_rule(&id).is_none() {
        return Err(RuleError::NotFound(id).into());
    }
    Ok(Json(engine.audit_log().query(&id, &params)))
}
