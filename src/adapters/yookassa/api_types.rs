//! YooKassa API objects as they appear on the wire.
//!
//! Only the fields the service reads are modelled; unknown fields are
//! ignored so API additions do not break parsing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::subscription::{Money, PaymentStatus};
use crate::ports::{GatewayPayment, PaymentError};

/// Metadata key carrying the paying user's id.
pub const USER_ID_METADATA_KEY: &str = "user_id";

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentBody {
    pub amount: AmountObject,
    pub confirmation: ConfirmationRequest,
    pub capture: bool,
    pub description: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub return_url: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AmountObject {
    pub value: String,
    pub currency: String,
}

impl From<&Money> for AmountObject {
    fn from(money: &Money) -> Self {
        Self {
            value: money.to_decimal_string(),
            currency: money.currency().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub confirmation_url: Option<String>,
}

/// A payment object.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentObject {
    pub id: String,
    pub status: String,
    pub amount: AmountObject,
    pub confirmation: Option<ConfirmationObject>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentObject {
    /// Owner recorded at creation. Absent or unparsable metadata yields `None`.
    pub fn owner(&self) -> Option<UserId> {
        self.metadata
            .get(USER_ID_METADATA_KEY)
            .and_then(|v| v.parse().ok())
    }

    pub fn payment_id(&self) -> Result<PaymentId, PaymentError> {
        PaymentId::new(self.id.clone()).map_err(|e| PaymentError::invalid_response(e.to_string()))
    }

    pub fn status(&self) -> Result<PaymentStatus, PaymentError> {
        self.status
            .parse()
            .map_err(|e: crate::domain::foundation::ValidationError| {
                PaymentError::invalid_response(e.to_string())
            })
    }

    pub fn into_gateway_payment(self) -> Result<GatewayPayment, PaymentError> {
        let amount = Money::from_decimal_str(&self.amount.value, &self.amount.currency)
            .map_err(|e| PaymentError::invalid_response(e.to_string()))?;
        Ok(GatewayPayment {
            payment_id: self.payment_id()?,
            status: self.status()?,
            owner: self.owner(),
            amount,
        })
    }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Asynchronous notification about a payment event.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub object: NotificationPayment,
}

/// The part of a notification's payment the service trusts: its id.
/// Status and owner are re-read from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayment {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl NotificationPayment {
    pub fn owner(&self) -> Option<UserId> {
        self.metadata
            .get(USER_ID_METADATA_KEY)
            .and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYMENT_JSON: &str = r#"{
        "id": "2d8f3c5a-000f-5000-9000-1b2c3d4e5f60",
        "status": "succeeded",
        "paid": true,
        "amount": {"value": "1000.00", "currency": "RUB"},
        "confirmation": {"type": "redirect", "confirmation_url": "https://yoomoney.ru/checkout/payments/v2/contract?orderId=abc"},
        "created_at": "2025-01-15T10:30:00.000Z",
        "metadata": {"user_id": "123456789"}
    }"#;

    #[test]
    fn parses_payment_object() {
        let payment: PaymentObject = serde_json::from_str(PAYMENT_JSON).unwrap();
        assert_eq!(payment.owner(), Some(UserId::new(123456789)));

        let gateway = payment.into_gateway_payment().unwrap();
        assert_eq!(gateway.status, PaymentStatus::Succeeded);
        assert_eq!(gateway.amount.amount_minor(), 100_000);
        assert_eq!(gateway.payment_id.as_str(), "2d8f3c5a-000f-5000-9000-1b2c3d4e5f60");
    }

    #[test]
    fn missing_metadata_means_unknown_owner() {
        let payment: PaymentObject = serde_json::from_str(
            r#"{"id": "p1", "status": "pending", "amount": {"value": "1.00", "currency": "RUB"}}"#,
        )
        .unwrap();
        assert_eq!(payment.owner(), None);
        assert!(payment.confirmation.is_none());
    }

    #[test]
    fn unknown_status_is_invalid_response() {
        let payment: PaymentObject = serde_json::from_str(
            r#"{"id": "p1", "status": "refunded", "amount": {"value": "1.00", "currency": "RUB"}}"#,
        )
        .unwrap();
        assert!(payment.into_gateway_payment().is_err());
    }

    #[test]
    fn create_body_serializes_wire_names() {
        let body = CreatePaymentBody {
            amount: AmountObject::from(&Money::new(100_000, "RUB").unwrap()),
            confirmation: ConfirmationRequest {
                kind: "redirect".into(),
                return_url: "https://t.me/pass_bot?start=payment_1".into(),
            },
            capture: true,
            description: "Channel access, 30 days".into(),
            metadata: HashMap::from([(USER_ID_METADATA_KEY.to_string(), "1".to_string())]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["amount"]["value"], "1000.00");
        assert_eq!(json["confirmation"]["type"], "redirect");
        assert_eq!(json["capture"], true);
        assert_eq!(json["metadata"]["user_id"], "1");
    }

    #[test]
    fn parses_notification() {
        let note: NotificationObject = serde_json::from_str(&format!(
            r#"{{"type": "notification", "event": "payment.succeeded", "object": {}}}"#,
            PAYMENT_JSON
        ))
        .unwrap();
        assert_eq!(note.event, "payment.succeeded");
        assert_eq!(note.object.owner(), Some(UserId::new(123456789)));
    }
}
