//! Payment entity and money value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{PaymentId, Timestamp, UserId, ValidationError};

use super::PaymentStatus;

/// An amount of money in integer minor units (kopecks, cents).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: String,
}

impl Money {
    /// Creates a non-negative amount in a three-letter ISO 4217 currency.
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Result<Self, ValidationError> {
        if amount_minor < 0 {
            return Err(ValidationError::out_of_range(
                "amount_minor",
                0,
                i64::MAX,
                amount_minor,
            ));
        }
        let currency = currency.into().trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected a three-letter ISO 4217 code",
            ));
        }
        Ok(Self {
            amount_minor,
            currency,
        })
    }

    /// Parses a decimal string such as `"1000.00"` into minor units.
    pub fn from_decimal_str(value: &str, currency: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid_format("amount", format!("'{}'", value));
        let (major, minor) = match value.trim().split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (value.trim(), "0"),
        };
        if minor.is_empty() || minor.len() > 2 || !minor.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let major: i64 = major.parse().map_err(|_| invalid())?;
        let minor: i64 = format!("{:0<2}", minor).parse().map_err(|_| invalid())?;
        let amount_minor = major
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(invalid)?;
        Self::new(amount_minor, currency)
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Decimal rendering with two fraction digits, e.g. `"1000.00"`.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.amount_minor / 100, self.amount_minor % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal_string(), self.currency)
    }
}

/// One payment attempt. Created pending, then only its status moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub amount: Money,
    pub created_at: Timestamp,
    pub status: PaymentStatus,
    pub status_changed_at: Option<Timestamp>,
}

impl Payment {
    /// A freshly initiated payment awaiting the payer.
    pub fn pending(payment_id: PaymentId, user_id: UserId, amount: Money, now: Timestamp) -> Self {
        Self {
            payment_id,
            user_id,
            amount,
            created_at: now,
            status: PaymentStatus::Pending,
            status_changed_at: None,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
