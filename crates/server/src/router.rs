//! HTTP router construction.
//!
//! Assembles all Axum routes and middleware into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .route("/health", get(api::health::health))
        .route("/rules", get(api::rules::list_rules).post(api::rules::create_rule))
        .route(
            "/rules/{id}",
            get(api::rules::get_rule)
                .put(api::rules::update_rule)
                .delete(api::rules::delete_rule),
        )
        .route("/rules/{id}/toggle", post(api::rules::toggle_rule))
        .route("/rules/{id}/logs", get(api::rules::rule_logs))
        .route("/events", post(api::events::submit_event))
        .route("/alerts", get(api::alerts::list_alerts))
        // Static segments must stay ahead of /alerts/{id}.
        .route("/alerts/counts", get(api::alerts::alert_counts))
        .route("/alerts/read-all", post(api::alerts::mark_all_read))
        .route("/alerts/{id}", get(api::alerts::get_alert))
        .route("/alerts/{id}/read", post(api::alerts::mark_read))
        .route("/alerts/{id}/pin", post(api::alerts::toggle_pin))
        .route("/alerts/{id}/dismiss", post(api::alerts::dismiss))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS_ORIGIN, falling back to permissive CORS");
            CorsLayer::permissive()
        }
    }
}
