use crate::api::{alert_error_response, error_response, success_response};
use crate::logging::TraceId;
use crate::middleware::OrgContext;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use oxdash_common::types::UpdateAlertStateCommand;
use serde::{Deserialize, Serialize};

/// Parses a numeric path segment, answering 400 in the envelope otherwise.
fn parse_id(trace_id: &str, what: &str, raw: &str) -> Result<i64, Response> {
    raw.trim().parse::<i64>().map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            trace_id,
            "bad_request",
            &format!("invalid {what}: {raw}"),
        )
    })
}

// ---- Alerts ----

async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    Extension(OrgContext(org)): Extension<OrgContext>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.alerts.list_alerts(org) {
        Ok(alerts) => success_response(StatusCode::OK, &trace_id, alerts),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

async fn get_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(OrgContext(org)): Extension<OrgContext>,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Response {
    let alert_id = match parse_id(&trace_id, "alert id", &raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.alerts.get_alert(org, alert_id) {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, alert),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

#[derive(Serialize)]
struct DeletedAlertResponse {
    alert_id: i64,
}

async fn delete_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(OrgContext(org)): Extension<OrgContext>,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Response {
    let alert_id = match parse_id(&trace_id, "alert id", &raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.alerts.delete_alert(org, alert_id).await {
        Ok(alert_id) => {
            tracing::info!(trace_id = %*trace_id, org = %org, alert_id, "Alert deleted");
            success_response(StatusCode::OK, &trace_id, DeletedAlertResponse { alert_id })
        }
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

// ---- Alert changes ----

#[derive(Debug, Deserialize)]
struct AlertChangesParams {
    limit: Option<usize>,
}

async fn list_alert_changes(
    Extension(trace_id): Extension<TraceId>,
    Extension(OrgContext(org)): Extension<OrgContext>,
    State(state): State<AppState>,
    params: Result<Query<AlertChangesParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &rejection.body_text(),
            )
        }
    };
    match state.alerts.list_changes(org, params.limit) {
        Ok(changes) => success_response(StatusCode::OK, &trace_id, changes),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

// ---- Alert state ----

async fn get_alert_state_log(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Response {
    let alert_id = match parse_id(&trace_id, "alert id", &raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.alerts.get_state_log(alert_id) {
        Ok(entries) => success_response(StatusCode::OK, &trace_id, entries),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

async fn set_alert_state(
    Extension(trace_id): Extension<TraceId>,
    Extension(OrgContext(org)): Extension<OrgContext>,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateAlertStateCommand>, JsonRejection>,
) -> Response {
    let alert_id = match parse_id(&trace_id, "alert id", &raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let cmd = match body {
        Ok(Json(cmd)) => cmd,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &rejection.body_text(),
            )
        }
    };
    match state.alerts.set_state(org, alert_id, cmd).await {
        Ok(transition) => success_response(StatusCode::OK, &trace_id, transition),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

// ---- Dashboard listings ----

async fn list_dashboard_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(raw_dashboard_id): Path<String>,
) -> Response {
    let dashboard_id = match parse_id(&trace_id, "dashboard id", &raw_dashboard_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.alerts.list_for_dashboard(dashboard_id) {
        Ok(alerts) => success_response(StatusCode::OK, &trace_id, alerts),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

async fn list_panel_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((raw_dashboard_id, raw_panel_id)): Path<(String, String)>,
) -> Response {
    let dashboard_id = match parse_id(&trace_id, "dashboard id", &raw_dashboard_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let panel_id = match parse_id(&trace_id, "panel id", &raw_panel_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.alerts.list_for_panel(dashboard_id, panel_id) {
        Ok(alerts) => success_response(StatusCode::OK, &trace_id, alerts),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/alerts", get(list_alerts))
        .route("/v1/alerts/changes", get(list_alert_changes))
        .route("/v1/alerts/:alert_id", get(get_alert).delete(delete_alert))
        .route(
            "/v1/alerts/state/:alert_id",
            get(get_alert_state_log).put(set_alert_state),
        )
        .route("/v1/alerts-dashboard/:dashboard_id", get(list_dashboard_alerts))
        .route(
            "/v1/alerts-dashboard/:dashboard_id/:panel_id",
            get(list_panel_alerts),
        )
}
