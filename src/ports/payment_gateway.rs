//! Payment gateway port for the external payment processor.
//!
//! The gateway is the source of truth for a payment's status and owner.
//! Inbound notifications only name a payment; the status is always
//! re-read through [`PaymentGateway::fetch_payment`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::subscription::{Money, PaymentStatus, SubscriptionError};

/// Port for payment processor integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a one-off payment and returns where the payer confirms it.
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CreatedPayment, PaymentError>;

    /// Looks up a payment. `Ok(None)` when the processor does not know it.
    async fn fetch_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<GatewayPayment>, PaymentError>;
}

/// Request to create a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePaymentRequest {
    /// Recorded as payment metadata and checked on confirmation.
    pub user_id: UserId,
    pub amount: Money,
    pub description: String,
    /// Where the payer lands after confirming.
    pub return_url: String,
}

/// A payment the processor accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
    pub payment_id: PaymentId,
    pub confirmation_url: String,
    pub status: PaymentStatus,
}

/// The processor's view of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    /// Owner from the metadata recorded at creation, if present.
    pub owner: Option<UserId>,
    pub amount: Money,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Processor's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for SubscriptionError {
    fn from(err: PaymentError) -> Self {
        SubscriptionError::collaborator("payment gateway", err.to_string())
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue or timeout.
    NetworkError,

    /// Shop credentials rejected.
    AuthenticationError,

    /// Request rejected as malformed.
    InvalidRequest,

    /// Response could not be understood.
    InvalidResponse,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Processor-side failure.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::InvalidResponse => "invalid_response",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
