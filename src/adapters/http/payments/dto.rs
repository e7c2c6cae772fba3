//! HTTP DTOs for payment notification endpoints.

use serde::Serialize;

use crate::application::ConfirmPaymentResult;

/// Event types that describe a payment's own lifecycle.
pub const PAYMENT_EVENTS: &[&str] = &[
    "payment.succeeded",
    "payment.waiting_for_capture",
    "payment.canceled",
];

/// Acknowledgement returned for every processed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResponse {
    pub outcome: &'static str,
}

impl NotificationResponse {
    pub fn ignored() -> Self {
        Self { outcome: "ignored" }
    }
}

impl From<&ConfirmPaymentResult> for NotificationResponse {
    fn from(result: &ConfirmPaymentResult) -> Self {
        let outcome = match result {
            ConfirmPaymentResult::NotFound => "not_found",
            ConfirmPaymentResult::AlreadyApplied { .. } => "already_applied",
            ConfirmPaymentResult::NotSucceeded(_) => "not_succeeded",
            ConfirmPaymentResult::Applied { .. } => "applied",
        };
        Self { outcome }
    }
}

/// Standard error response format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
