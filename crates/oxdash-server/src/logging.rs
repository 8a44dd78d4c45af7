use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use std::fmt::Write;
use std::time::Instant;

use crate::api::error_response;
use crate::state::AppState;

/// Per-request trace id stored in request extensions and echoed back as
/// `X-Trace-Id`.
#[derive(Clone)]
pub struct TraceId(pub String);

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// 16 hex characters from 8 random bytes.
fn generate_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let mut s = String::with_capacity(16);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Maximum number of characters to log from request/response body.
const MAX_BODY_LOG_CHARS: usize = 200;

/// Largest PUT body accepted; larger bodies are answered with 413.
pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

fn truncate_body(bytes: &[u8], max: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() > max => {
            let mut end = max;
            while end > 0 && !s.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &s[..end])
        }
        Ok(s) => s.to_string(),
        Err(_) => "<non-utf8 body>".to_string(),
    }
}

fn format_elapsed(elapsed_us: u128) -> String {
    if elapsed_us < 1000 {
        format!("{elapsed_us}µs")
    } else if elapsed_us < 1_000_000 {
        format!("{}ms", elapsed_us / 1000)
    } else {
        format!("{:.1}s", elapsed_us as f64 / 1_000_000.0)
    }
}

/// Request/response logging middleware.
///
/// Assigns the trace id, logs method, path, caller org and (for PUT bodies)
/// a truncated body snippet, then logs status and latency of the response.
/// Server errors are logged at `error`, client errors at `warn`.
pub async fn request_logging(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let trace_id = generate_trace_id();
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let method = req.method().clone();
    let path = match req.uri().query() {
        Some(q) if !q.is_empty() => format!("{}?{q}", req.uri().path()),
        _ => req.uri().path().to_string(),
    };
    let org = req
        .headers()
        .get(state.config.org_header.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let (req, body_snippet) = if method == Method::PUT {
        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    trace_id = %trace_id,
                    method = %method,
                    path = %path,
                    org = %org,
                    error = %e,
                    "--> request rejected: body unreadable or over limit"
                );
                let mut response = error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    &trace_id,
                    "payload_too_large",
                    &format!("request body exceeds {MAX_REQUEST_BODY_BYTES} bytes"),
                );
                if let Ok(val) = HeaderValue::from_str(&trace_id) {
                    response.headers_mut().insert("x-trace-id", val);
                }
                return response;
            }
        };
        let snippet = truncate_body(&bytes, MAX_BODY_LOG_CHARS);
        (Request::from_parts(parts, Body::from(bytes)), snippet)
    } else {
        (req, String::new())
    };

    tracing::info!(
        trace_id = %trace_id,
        method = %method,
        path = %path,
        org = %org,
        body = %body_snippet,
        "--> request"
    );

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = format_elapsed(start.elapsed().as_micros());
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(trace_id = %trace_id, status, elapsed = %elapsed, "<-- response");
    } else if response.status().is_client_error() {
        tracing::warn!(trace_id = %trace_id, status, elapsed = %elapsed, "<-- response");
    } else {
        tracing::info!(trace_id = %trace_id, status, elapsed = %elapsed, "<-- response");
    }

    if let Ok(val) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("x-trace-id", val);
    }
    response
}
