//! HTTP adapters - REST endpoints.

use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod payments;

pub use payments::{payments_router, PaymentsAppState};

/// The full application router with tracing and a request timeout.
pub fn app_router(state: PaymentsAppState, request_timeout: Duration) -> Router {
    payments_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}
