//! Alert query and lifecycle endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use chainwatch_alerts::{Alert, AlertCounts, AlertFilter, AlertId};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// List alerts matching the query filter, newest first.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AlertFilter>,
) -> Json<Vec<Alert>> {
    Json(state.pipeline.store().query(&filter, Utc::now()))
}

pub async fn alert_counts(State(state): State<Arc<AppState>>) -> Json<AlertCounts> {
    Json(state.pipeline.store().counts(Utc::now()))
}

pub async fn get_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AlertId>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.pipeline.store().get(id)?))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AlertId>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.pipeline.store().mark_read(id)?))
}

pub async fn toggle_pin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AlertId>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.pipeline.store().toggle_pin(id)?))
}

/// Dismiss an alert; pending notifications for it are cancelled.
pub async fn dismiss(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AlertId>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.pipeline.dismiss(id)?))
}

pub async fn mark_all_read(State(state): State<Arc<AppState>>) -> Json<MarkAllReadResponse> {
    Json(MarkAllReadResponse {
        updated: state.pipeline.store().mark_all_read(),
    })
}
