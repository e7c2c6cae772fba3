//! HTTP handlers for payment notifications.
//!
//! The notification body is only used to learn which payment changed and
//! who claims it. Status and amount are always re-read from the gateway by
//! `ConfirmPaymentHandler`, so a forged body cannot grant access.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::yookassa::NotificationObject;
use crate::application::{ConfirmPaymentCommand, ConfirmPaymentHandler};
use crate::domain::foundation::PaymentId;
use crate::domain::subscription::SubscriptionError;

use super::dto::{ErrorResponse, NotificationResponse, PAYMENT_EVENTS};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct PaymentsAppState {
    pub confirm: Arc<ConfirmPaymentHandler>,
}

/// POST /webhooks/payments - Handle a gateway notification
pub async fn handle_payment_notification(
    State(state): State<PaymentsAppState>,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let notification: NotificationObject = serde_json::from_slice(&body)
        .map_err(|e| PaymentsApiError::BadRequest(format!("Malformed notification: {}", e)))?;

    if !PAYMENT_EVENTS.contains(&notification.event.as_str()) {
        tracing::debug!(event = %notification.event, "Notification ignored");
        return Ok(Json(NotificationResponse::ignored()));
    }

    let payment_id = PaymentId::new(notification.object.id.clone())
        .map_err(|e| PaymentsApiError::BadRequest(e.to_string()))?;
    let Some(user_id) = notification.object.owner() else {
        tracing::warn!(payment_id = %payment_id, "Notification without owner metadata");
        return Ok(Json(NotificationResponse::ignored()));
    };

    tracing::info!(
        payment_id = %payment_id,
        user_id = %user_id,
        event = %notification.event,
        "Payment notification received"
    );

    let result = state
        .confirm
        .handle(ConfirmPaymentCommand {
            payment_id,
            user_id,
        })
        .await?;

    Ok(Json(NotificationResponse::from(&result)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
///
/// Transient failures answer 503 so the gateway redelivers later.
pub enum PaymentsApiError {
    BadRequest(String),
    Domain(SubscriptionError),
}

impl From<SubscriptionError> for PaymentsApiError {
    fn from(err: SubscriptionError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for PaymentsApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            PaymentsApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message),
            ),
            PaymentsApiError::Domain(err) => {
                let status = match &err {
                    SubscriptionError::OwnershipMismatch { .. } => StatusCode::CONFLICT,
                    SubscriptionError::UserNotFound(_) | SubscriptionError::PaymentNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
                    SubscriptionError::Forbidden(_) => StatusCode::FORBIDDEN,
                    e if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                tracing::warn!(code = err.code(), error = %err, status = %status, "Notification failed");
                (status, ErrorResponse::new(err.code(), err.to_string()))
            }
        };
        (status, Json(body)).into_response()
    }
}
