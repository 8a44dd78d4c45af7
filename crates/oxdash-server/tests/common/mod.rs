#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use oxdash_common::types::{AlertRule, AlertState, Dashboard, NewAlertRule, OrgId};
use oxdash_server::app;
use oxdash_server::config::ServerConfig;
use oxdash_server::state::AppState;
use oxdash_storage::AlertStore;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub fn build_test_context() -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let store = Arc::new(AlertStore::new(temp_dir.path())?);

    let config = ServerConfig {
        data_dir: temp_dir.path().to_string_lossy().to_string(),
        ..ServerConfig::default()
    };

    let state = AppState::new(store, config);
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    org: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(org) = org {
        builder = builder.header("x-org-id", org);
    }

    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub fn seed_dashboard(state: &AppState, id: i64, slug: &str) {
    state
        .store
        .upsert_dashboard(&Dashboard {
            id,
            org_id: Some(OrgId(1)),
            slug: slug.to_string(),
            title: slug.to_string(),
        })
        .expect("dashboard should upsert");
}

pub fn seed_alert(state: &AppState, org: Option<i64>, dashboard_id: i64, panel_id: i64) -> AlertRule {
    state
        .store
        .insert_alert(&NewAlertRule {
            org_id: org.map(OrgId),
            dashboard_id,
            panel_id,
            query: "avg(cpu.usage)".to_string(),
            query_ref_id: "A".to_string(),
            query_range: 300,
            aggregator: "avg".to_string(),
            warn_level: 80.0,
            crit_level: 90.0,
            interval: 60,
            title: format!("alert on {dashboard_id}/{panel_id}"),
            description: String::new(),
            state: AlertState::Ok,
        })
        .expect("alert should insert")
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}
