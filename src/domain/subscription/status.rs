//! Payment status state machine.
//!
//! Statuses only move forward. `Succeeded` and `Canceled` are terminal, so
//! a late or duplicated notification can never walk a payment backwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, awaiting the payer.
    Pending,

    /// Authorized by the payer, awaiting capture.
    WaitingForCapture,

    /// Funds captured. Grants a paid period exactly once.
    Succeeded,

    /// Abandoned, declined or refunded before capture.
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::WaitingForCapture => "waiting_for_capture",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded)
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, WaitingForCapture)
                | (Pending, Succeeded)
                | (Pending, Canceled)
                | (WaitingForCapture, Succeeded)
                | (WaitingForCapture, Canceled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![WaitingForCapture, Succeeded, Canceled],
            WaitingForCapture => vec![Succeeded, Canceled],
            Succeeded | Canceled => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "waiting_for_capture" => Ok(PaymentStatus::WaitingForCapture),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "canceled" | "cancelled" => Ok(PaymentStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::WaitingForCapture,
        PaymentStatus::Succeeded,
        PaymentStatus::Canceled,
    ];

    #[test]
    fn terminal_statuses() {
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::Canceled.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::WaitingForCapture.is_terminal());
    }

    #[test]
    fn backward_transitions_are_rejected() {
        assert!(PaymentStatus::Succeeded
            .transition_to(PaymentStatus::Pending)
            .is_err());
        assert!(PaymentStatus::WaitingForCapture
            .transition_to(PaymentStatus::Pending)
            .is_err());
        assert!(PaymentStatus::Canceled
            .transition_to(PaymentStatus::Succeeded)
            .is_err());
    }

    #[test]
    fn self_transitions_are_not_changes() {
        for status in ALL {
            assert!(!status.can_transition_to(&status));
        }
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn parses_wire_names() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert_eq!(
            "cancelled".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Canceled
        );
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::WaitingForCapture).unwrap();
        assert_eq!(json, "\"waiting_for_capture\"");
    }
}
