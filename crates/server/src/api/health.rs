use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub rules: usize,
    pub alerts: usize,
    pub channels: Vec<String>,
    pub pending_dispatches: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        rules: pipeline.engine().rule_count(),
        alerts: pipeline.store().len(),
        channels: pipeline.dispatcher().handler_refs(),
        pending_dispatches: pipeline.dispatcher().pending_count(),
    })
}
