//! Subscription store port.
//!
//! Durable record of users and payments. Every operation is atomic on its
//! own; the two multi-step writes (`apply_subscription_extension` and
//! `deactivate_if_lapsed`) re-read the user row under a lock and decide
//! inside the same transaction, so a stale read outside can never race a
//! concurrent write.
//!
//! # Concurrency
//!
//! Writes to one user serialize on that user's row. Implementations retry
//! transient "store busy" failures with bounded exponential backoff before
//! surfacing [`StoreError::Busy`].

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::domain::subscription::{
    Money, Payment, PaymentStatus, SubscriptionError, SubscriptionTerms, User,
};

/// Port for user and payment persistence.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Inserts a user on first contact; a no-op preserving every field when
    /// the user already exists. Returns true if a row was created.
    async fn upsert_user_on_first_contact(
        &self,
        user_id: UserId,
        display_name: Option<String>,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    async fn read_user(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Records a pending payment. A no-op if the id already exists.
    /// Returns true if a row was created.
    async fn create_pending_payment(&self, payment: &Payment) -> Result<bool, StoreError>;

    async fn read_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError>;

    /// Moves a payment to `status`. Backward or unknown-row transitions are
    /// rejected as no-ops; returns whether the row changed.
    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Grants one paid period for a succeeded payment, all-or-nothing.
    ///
    /// Computes the new end from the locked user row with
    /// [`next_subscription_end`](crate::domain::subscription::next_subscription_end),
    /// sets the user active with the trial consumed, and marks the payment
    /// succeeded (inserting it if it was never recorded).
    async fn apply_subscription_extension(
        &self,
        request: ExtensionRequest,
    ) -> Result<ExtensionOutcome, StoreError>;

    /// Sets `active=false` unconditionally. Returns whether a row matched.
    async fn deactivate_user(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Sets `active=false` only if the locked row's effective period has
    /// ended before `now` (see `is_lapsed`). Returns whether the
    /// deactivation was applied.
    async fn deactivate_if_lapsed(
        &self,
        user_id: UserId,
        now: Timestamp,
        terms: SubscriptionTerms,
    ) -> Result<bool, StoreError>;

    async fn list_active_users(&self) -> Result<Vec<User>, StoreError>;

    /// Most recent payment by creation time.
    async fn latest_payment_for_user(&self, user_id: UserId)
        -> Result<Option<Payment>, StoreError>;
}

/// Input to [`SubscriptionStore::apply_subscription_extension`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub now: Timestamp,
    pub terms: SubscriptionTerms,
}

/// What applying an extension did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOutcome {
    /// A new period was granted.
    Applied { new_end: Timestamp },

    /// The payment had already succeeded; nothing changed.
    AlreadyApplied { subscription_end: Option<Timestamp> },

    /// The stored payment belongs to another user; nothing changed.
    OwnershipMismatch,

    /// No such user; nothing changed.
    UserNotFound,

    /// The stored payment is final and cannot become `succeeded`
    /// (a canceled payment); nothing changed.
    StatusConflict { status: PaymentStatus },
}

/// Errors from the subscription store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Contention or connectivity that outlived the retry budget.
    #[error("store busy: {0}")]
    Busy(String),

    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back to the domain.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_))
    }
}

impl From<StoreError> for SubscriptionError {
    fn from(err: StoreError) -> Self {
        let transient = err.is_transient();
        SubscriptionError::storage(err.to_string(), transient)
    }
}
