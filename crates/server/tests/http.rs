//! HTTP contract tests driven through the router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use chainwatch_alerts::AlertStore;
use chainwatch_core::config::{DispatchConfig, RulesConfig};
use chainwatch_notify::{ActionDispatcher, LogNotifier};
use chainwatch_rules::audit_log::AuditLog;
use chainwatch_rules::RuleEngine;
use chainwatch_server::{build_router, AlertPipeline, AppState};

fn app() -> Router {
    let audit = Arc::new(AuditLog::new());
    let engine = RuleEngine::new(&RulesConfig::default()).with_audit_log(Arc::clone(&audit));
    let dispatcher = ActionDispatcher::new(DispatchConfig::default()).with_audit_log(audit);
    dispatcher.register("log", Arc::new(LogNotifier::default()));
    let pipeline = AlertPipeline::new(Arc::new(engine), Arc::new(AlertStore::new()), Arc::new(dispatcher));
    build_router(Arc::new(AppState::new(pipeline, "*")))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn whale_rule() -> Value {
    json!({
        "id": "whale",
        "name": "Whale transfer to new wallet",
        "category": "whale",
        "priority": 80,
        "cooldownMinutes": 15,
        "conditions": [
            { "field": "transferAmountUsd", "operator": "gt", "value": 1000000 },
            { "field": "walletAge", "operator": "lt", "value": 7, "logicalOperator": "AND" }
        ],
        "alert": {
            "actions": [{ "id": "notify", "label": "Notify", "handlerRef": "log" }]
        }
    })
}

fn whale_event() -> Value {
    json!({
        "type": "whale_transfer",
        "fields": { "transferAmountUsd": 2500000, "walletAge": 3 }
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["channels"], json!(["log"]));
}

#[tokio::test]
async fn create_rule_defaults_and_conflict() {
    let app = app();
    let (status, rule) = send(&app, Method::POST, "/rules", Some(whale_rule())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rule["enabled"], true);
    assert_eq!(rule["lastTriggeredAt"], Value::Null);

    let (status, _) = send(&app, Method::POST, "/rules", Some(whale_rule())).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_rule_is_rejected_with_report() {
    let app = app();
    let mut rule = whale_rule();
    rule["conditions"][0]["value"] = json!("lots");
    let (status, body) = send(&app, Method::POST, "/rules", Some(rule)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["validation"]["valid"], false);
    assert_eq!(body["validation"]["errors"][0]["path"], "conditions[0].value");

    let (_, rules) = send(&app, Method::GET, "/rules", None).await;
    assert_eq!(rules, json!([]));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app();
    let (status, _) = send(&app, Method::POST, "/rules", Some(json!({ "name": 42 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/rules/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, "/rules/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/rules/nope/logs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/alerts/{}/dismiss", uuid::Uuid::new_v4());
    let (status, _) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn event_to_alert_lifecycle() {
    let app = app();
    send(&app, Method::POST, "/rules", Some(whale_rule())).await;

    let (status, outcome) = send(&app, Method::POST, "/events", Some(whale_event())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["alerts"].as_array().unwrap().len(), 1);
    let id = outcome["alerts"][0]["id"].as_str().unwrap().to_string();

    // Second event inside the cooldown window is suppressed.
    let (_, outcome) = send(&app, Method::POST, "/events", Some(whale_event())).await;
    assert_eq!(outcome["alerts"], json!([]));
    assert_eq!(outcome["suppressed"], json!(["whale"]));

    let (_, alerts) = send(&app, Method::GET, "/alerts?active=true&type=high", None).await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);

    let (_, alert) = send(&app, Method::POST, &format!("/alerts/{id}/read"), None).await;
    assert_eq!(alert["isRead"], true);
    let (_, alert) = send(&app, Method::POST, &format!("/alerts/{id}/pin"), None).await;
    assert_eq!(alert["isPinned"], true);

    let (status, alert) = send(&app, Method::POST, &format!("/alerts/{id}/dismiss"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alert["isActive"], false);

    let (_, active) = send(&app, Method::GET, "/alerts?active=true", None).await;
    assert_eq!(active, json!([]));
    let (_, counts) = send(&app, Method::GET, "/alerts/counts", None).await;
    assert_eq!(counts["total"], 1);
    assert_eq!(counts["active"], 0);

    let (_, rule) = send(&app, Method::GET, "/rules/whale", None).await;
    assert!(rule["lastTriggeredAt"].is_string());

    let (_, logs) = send(&app, Method::GET, "/rules/whale/logs?phase=cooldown", None).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn active_only_query_excludes_dismissed_alerts() {
    let app = app();
    send(&app, Method::POST, "/rules", Some(whale_rule())).await;
    let (_, outcome) = send(&app, Method::POST, "/events", Some(whale_event())).await;
    let id = outcome["alerts"][0]["id"].as_str().unwrap().to_string();

    let (_, active) = send(&app, Method::GET, "/alerts?activeOnly=true", None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    send(&app, Method::POST, &format!("/alerts/{id}/dismiss"), None).await;

    let (status, active) = send(&app, Method::GET, "/alerts?activeOnly=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active, json!([]));
    let (_, all) = send(&app, Method::GET, "/alerts", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn toggle_is_idempotent_and_disables_matching() {
    let app = app();
    send(&app, Method::POST, "/rules", Some(whale_rule())).await;

    for _ in 0..2 {
        let (status, rule) =
            send(&app, Method::POST, "/rules/whale/toggle", Some(json!({ "enabled": false }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rule["enabled"], false);
    }

    let (_, outcome) = send(&app, Method::POST, "/events", Some(whale_event())).await;
    assert_eq!(outcome["evaluated"], 0);
    assert_eq!(outcome["alerts"], json!([]));
}

#[tokio::test]
async fn delete_keeps_raised_alerts() {
    let app = app();
    send(&app, Method::POST, "/rules", Some(whale_rule())).await;
    send(&app, Method::POST, "/events", Some(whale_event())).await;

    let (status, _) = send(&app, Method::DELETE, "/rules/whale", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, alerts) = send(&app, Method::GET, "/alerts?ruleId=whale", None).await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    let (_, read) = send(&app, Method::POST, "/alerts/read-all", None).await;
    assert_eq!(read["updated"], 1);
}
