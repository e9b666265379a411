//! HTTP surface: router, CORS and request tracing

pub mod handlers;
pub mod state;

pub use state::{AppState, SharedState};

use crate::config::CorsConfig;
use axum::{
    body::Body,
    http::{HeaderValue, Request},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};

/// Build the CORS layer.
///
/// Credentials are allowed, so methods and headers mirror the request
/// instead of answering `*`. A `*` origin mirrors the request origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = config.origins();

    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    info!(origins = ?origins, "CORS allowed origins");

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Request span carrying the id set by `SetRequestIdLayer`
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Mount prefixes; the serverless deployment serves everything under `/api`
pub const ROUTE_PREFIXES: [&str; 2] = ["", "/api"];

/// Routes are served both at the root and under `/api`.
///
/// The request id is assigned outermost so the trace span and every
/// response, preflights included, carry it.
pub fn router(state: SharedState, cors: &CorsConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/api", get(handlers::root))
        .route("/api/", get(handlers::root));

    for prefix in ROUTE_PREFIXES {
        router = router
            .route(&format!("{prefix}/predict"), post(handlers::predict))
            .route(&format!("{prefix}/health"), get(handlers::health))
            .route(&format!("{prefix}/metrics"), get(handlers::metrics));
    }

    router
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
