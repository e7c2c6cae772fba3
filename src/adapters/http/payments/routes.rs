//! Axum router configuration for payment notification endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_payment_notification, health, PaymentsAppState};

/// Create the payments router.
///
/// # Routes
/// - `POST /webhooks/payments` - Gateway notifications (body re-verified with the gateway)
/// - `GET /health` - Liveness probe
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .route("/webhooks/payments", post(handle_payment_notification))
        .route("/health", get(health))
}
