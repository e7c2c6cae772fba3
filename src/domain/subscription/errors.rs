//! Subscription error taxonomy.
//!
//! | Error | Meaning | Caller action |
//! |-------|---------|---------------|
//! | Storage | Store failed, transient if retries ran out on a busy store | Apologize, alert operators |
//! | OwnershipMismatch | Payment belongs to someone else | Reject, no state change |
//! | UserNotFound / PaymentNotFound | Referenced record missing | Inform the caller |
//! | CollaboratorUnavailable | Gateway, channel or messaging failed | Log, continue if best-effort |
//! | Forbidden | Admin-only operation from a non-admin | Reject |
//! | InvalidState | Stored facts contradict the request | Alert operators |

use thiserror::Error;

use crate::domain::foundation::{PaymentId, UserId, ValidationError};

/// Errors raised by subscription use cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("storage failure: {message}")]
    Storage { message: String, transient: bool },

    #[error("payment {payment_id} does not belong to user {user_id}")]
    OwnershipMismatch { payment_id: PaymentId, user_id: UserId },

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("payment {0} not found")]
    PaymentNotFound(PaymentId),

    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        message: String,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SubscriptionError {
    pub fn storage(message: impl Into<String>, transient: bool) -> Self {
        SubscriptionError::Storage {
            message: message.into(),
            transient,
        }
    }

    pub fn ownership_mismatch(payment_id: PaymentId, user_id: UserId) -> Self {
        SubscriptionError::OwnershipMismatch {
            payment_id,
            user_id,
        }
    }

    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        SubscriptionError::CollaboratorUnavailable {
            collaborator,
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        SubscriptionError::Forbidden(reason.into())
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        SubscriptionError::InvalidState(reason.into())
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SubscriptionError::Storage { transient, .. } => *transient,
            SubscriptionError::CollaboratorUnavailable { .. } => true,
            _ => false,
        }
    }

    /// Stable code for logs and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SubscriptionError::Storage { .. } => "STORAGE_ERROR",
            SubscriptionError::OwnershipMismatch { .. } => "OWNERSHIP_MISMATCH",
            SubscriptionError::UserNotFound(_) => "USER_NOT_FOUND",
            SubscriptionError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            SubscriptionError::CollaboratorUnavailable { .. } => "COLLABORATOR_UNAVAILABLE",
            SubscriptionError::Forbidden(_) => "FORBIDDEN",
            SubscriptionError::InvalidState(_) => "INVALID_STATE",
            SubscriptionError::Validation(_) => "VALIDATION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_mismatch_names_both_parties() {
        let err = SubscriptionError::ownership_mismatch(
            PaymentId::new("pay-9").unwrap(),
            UserId::new(42),
        );
        let text = err.to_string();
        assert!(text.contains("pay-9"));
        assert!(text.contains("42"));
        assert_eq!(err.code(), "OWNERSHIP_MISMATCH");
    }

    #[test]
    fn transience_classification() {
        assert!(SubscriptionError::storage("busy", true).is_transient());
        assert!(!SubscriptionError::storage("constraint", false).is_transient());
        assert!(SubscriptionError::collaborator("notifier", "timeout").is_transient());
        assert!(!SubscriptionError::forbidden("not an admin").is_transient());
    }

    #[test]
    fn validation_errors_convert() {
        let err: SubscriptionError = ValidationError::empty_field("payment_id").into();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }
}
