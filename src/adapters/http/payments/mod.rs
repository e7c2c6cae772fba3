//! HTTP adapter for payment notifications.
//!
//! - `POST /webhooks/payments` - Confirm the payment a notification names
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::PaymentsAppState;
pub use routes::payments_router;
