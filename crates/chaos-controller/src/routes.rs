//! Route definitions for the controller API.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Default request timeout (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum request body size (1 MB).
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;
/// Default max concurrent requests.
const DEFAULT_CONCURRENCY_LIMIT: usize = 256;

/// Build the Axum router with all controller routes.
///
/// Wrong methods on a known path get 405 from the router itself.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/start", post(handlers::start))
        .route("/stop", post(handlers::stop))
        .route("/experiments", get(handlers::experiments))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(DEFAULT_REQUEST_TIMEOUT))
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
        .layer(ConcurrencyLimitLayer::new(DEFAULT_CONCURRENCY_LIMIT))
}
