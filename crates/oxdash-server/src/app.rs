use crate::state::AppState;
use crate::{api, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_http_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    api::public_routes()
        .merge(api::org_routes().layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::org_context_middleware,
        )))
        .with_state(state.clone())
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state,
            logging::request_logging,
        ))
}
