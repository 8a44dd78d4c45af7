pub mod alerts;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use oxdash_alert::AlertError;
use serde::Serialize;
use serde_json::Value;

/// Envelope wrapping every response body.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 0 on success.
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
    pub data: Option<T>,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "not_found" => 1004,
        "forbidden" => 1006,
        "payload_too_large" => 1010,
        "storage_error" => 1501,
        "internal_error" => 1500,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Maps an [`AlertError`] onto the HTTP status and error code of the
/// envelope. Internal failures are logged here and answered with a generic
/// message.
pub fn alert_error_response(trace_id: &str, err: &AlertError) -> Response {
    match err {
        AlertError::NotFound(_) => error_response(
            StatusCode::NOT_FOUND,
            trace_id,
            "not_found",
            &err.to_string(),
        ),
        AlertError::Forbidden(_) => error_response(
            StatusCode::FORBIDDEN,
            trace_id,
            "forbidden",
            &err.to_string(),
        ),
        AlertError::AlertIdMismatch { .. } | AlertError::BadRequest(_) => error_response(
            StatusCode::BAD_REQUEST,
            trace_id,
            "bad_request",
            &err.to_string(),
        ),
        AlertError::Internal(source) => {
            tracing::error!(trace_id = %trace_id, error = %source, "alert operation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "storage error",
            )
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    /// Alerts with an in-flight state update or delete.
    active_alert_scopes: usize,
    storage_status: String,
}

async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            active_alert_scopes: state.alerts.locks().active_scopes(),
            storage_status: "ok".to_string(),
        },
    )
}

/// Routes that need no organization context.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/v1/health", get(health))
}

/// Routes that run behind the organization middleware.
pub fn org_routes() -> Router<AppState> {
    Router::new().merge(alerts::alert_routes())
}
