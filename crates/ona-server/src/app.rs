//! Router construction.
//!
//! Builds the axum router with the dispatcher and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `hard_timeout` - Transport-level limit for a whole request, answered
///   with `408 Request Timeout`
pub(crate) fn create_router(state: Arc<AppState>, hard_timeout: Duration) -> Router {
    Router::new()
        .fallback(dispatch::handle)
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    hard_timeout,
                )),
        )
        .with_state(state)
}
