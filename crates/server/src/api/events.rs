use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use chainwatch_core::Event;

use super::ApiError;
use crate::pipeline::SubmitOutcome;
use crate::state::AppState;

/// Feed one event to the rule engine. Responds once alerts are stored;
/// notifications go out in the background.
pub async fn submit_event(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Event>, JsonRejection>,
) -> Result<Json<SubmitOutcome>, ApiError> {
    let Json(event) = body?;
    Ok(Json(state.pipeline.submit_event(&event)))
}
