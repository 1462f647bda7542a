//! Application routing

use axum::{
    http::HeaderName,
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{docs, health, sponsors};
use crate::middleware::{
    auth::{require_api_key, AuthState},
    logging::{log_request, REQUEST_ID_HEADER},
    metrics::{metrics_handler, track_metrics},
    rate_limit::{rate_limit, RateLimitState},
};
use crate::server::state::AppState;

/// Path of the sponsors endpoint, kept from the webhook the docs site calls
pub const SPONSORS_PATH: &str = "/api/github-sponsors-webhook";

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Probes, metrics and docs need no authentication
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/liveness", get(health::liveness))
        .route("/metrics", get(metrics_handler))
        .route("/docs/config", get(docs::docs_config));

    let auth_state = AuthState::new(state.settings.clone());
    let rate_limit_state = RateLimitState::new(state.settings.rate_limit.clone());

    // Layer order: last added = outermost = runs first, so auth runs before
    // rate_limit
    let sponsor_routes = Router::new()
        .route(
            SPONSORS_PATH,
            get(sponsors::get_sponsors).post(sponsors::get_sponsors),
        )
        .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit))
        .layer(middleware::from_fn_with_state(auth_state, require_api_key));

    Router::new()
        .merge(sponsor_routes)
        .merge(public_routes)
        .route_layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_metrics,
        ))
        .layer(create_cors_layer())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Create CORS layer with permissive settings
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderName::from_static("retry-after"),
        ])
}
