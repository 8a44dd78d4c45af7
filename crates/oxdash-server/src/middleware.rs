use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use oxdash_common::types::OrgId;

use crate::api::error_response;
use crate::logging::TraceId;
use crate::state::AppState;

/// Organization of the caller, resolved from the configured org header.
#[derive(Debug, Clone, Copy)]
pub struct OrgContext(pub OrgId);

/// Middleware that resolves the caller's organization.
///
/// Reads the header named by `org_header` in config (`x-org-id` by
/// default). A missing or empty header is rejected with 401, a value that is
/// not a positive integer with 400. On success the [`OrgContext`] is stored
/// in request extensions for the handlers.
pub async fn org_context_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let raw = req
        .headers()
        .get(state.config.org_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    match raw {
        None | Some("") => {
            tracing::warn!(
                trace_id = %trace_id,
                header = %state.config.org_header,
                "Request rejected: missing organization header"
            );
            error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                &format!("missing {} header", state.config.org_header),
            )
        }
        Some(value) => match value.parse::<OrgId>() {
            Ok(org) => {
                tracing::debug!(trace_id = %trace_id, org = %org, "organization resolved");
                req.extensions_mut().insert(OrgContext(org));
                next.run(req).await
            }
            Err(_) => {
                tracing::warn!(
                    trace_id = %trace_id,
                    value = %value,
                    "Request rejected: invalid organization header"
                );
                error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    &format!("invalid {} header", state.config.org_header),
                )
            }
        },
    }
}
