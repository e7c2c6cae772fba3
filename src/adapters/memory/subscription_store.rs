//! In-memory subscription store.
//!
//! Same semantics as the PostgreSQL adapter with one lock standing in for
//! row locks: every operation runs under a single writer, so each is
//! atomic and the in-transaction rechecks see the latest state.
//!
//! Intended for tests and local runs without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{PaymentId, StateMachine, Timestamp, UserId};
use crate::domain::subscription::{
    is_lapsed, next_subscription_end, Payment, PaymentStatus, SubscriptionTerms, User,
};
use crate::ports::{ExtensionOutcome, ExtensionRequest, StoreError, SubscriptionStore};

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    payments: HashMap<PaymentId, Payment>,
}

/// In-memory implementation of [`SubscriptionStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Inserts or replaces a user row as-is.
    pub async fn put_user(&self, user: User) {
        self.state.lock().await.users.insert(user.user_id, user);
    }

    /// Inserts or replaces a payment row as-is.
    pub async fn put_payment(&self, payment: Payment) {
        self.state
            .lock()
            .await
            .payments
            .insert(payment.payment_id.clone(), payment);
    }

    pub async fn payment_count(&self) -> usize {
        self.state.lock().await.payments.len()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert_user_on_first_contact(
        &self,
        user_id: UserId,
        display_name: Option<String>,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user_id) {
            return Ok(false);
        }
        state
            .users
            .insert(user_id, User::register(user_id, display_name, now));
        Ok(true)
    }

    async fn read_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn create_pending_payment(&self, payment: &Payment) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.payments.contains_key(&payment.payment_id) {
            return Ok(false);
        }
        let mut row = payment.clone();
        row.status = PaymentStatus::Pending;
        row.status_changed_at = None;
        state.payments.insert(row.payment_id.clone(), row);
        Ok(true)
    }

    async fn read_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.state.lock().await.payments.get(payment_id).cloned())
    }

    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.payments.get_mut(payment_id) {
            Some(payment) if payment.status.can_transition_to(&status) => {
                payment.status = status;
                payment.status_changed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn apply_subscription_extension(
        &self,
        request: ExtensionRequest,
    ) -> Result<ExtensionOutcome, StoreError> {
        let mut state = self.state.lock().await;

        let Some(user) = state.users.get(&request.user_id) else {
            return Ok(ExtensionOutcome::UserNotFound);
        };

        if let Some(payment) = state.payments.get(&request.payment_id) {
            if !payment.is_owned_by(request.user_id) {
                return Ok(ExtensionOutcome::OwnershipMismatch);
            }
        }

        let already_applied = state
            .payments
            .get(&request.payment_id)
            .map(|p| p.status.is_succeeded())
            .unwrap_or(false);
        if already_applied {
            return Ok(ExtensionOutcome::AlreadyApplied {
                subscription_end: user.subscription_end,
            });
        }
        if let Some(payment) = state.payments.get(&request.payment_id) {
            if !payment.status.can_transition_to(&PaymentStatus::Succeeded) {
                return Ok(ExtensionOutcome::StatusConflict {
                    status: payment.status,
                });
            }
        }

        let new_end = next_subscription_end(user, request.now, &request.terms);

        let payment = state
            .payments
            .entry(request.payment_id.clone())
            .or_insert_with(|| {
                Payment::pending(
                    request.payment_id.clone(),
                    request.user_id,
                    request.amount.clone(),
                    request.now,
                )
            });
        payment.status = PaymentStatus::Succeeded;
        payment.status_changed_at = Some(request.now);

        if let Some(user) = state.users.get_mut(&request.user_id) {
            user.apply_extension(new_end);
        }

        Ok(ExtensionOutcome::Applied { new_end })
    }

    async fn deactivate_user(&self, user_id: UserId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.deactivate();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_if_lapsed(
        &self,
        user_id: UserId,
        now: Timestamp,
        terms: SubscriptionTerms,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if !user.active {
            return Ok(false);
        }
        if !is_lapsed(user, now, terms.trial_days) {
            return Ok(false);
        }
        user.deactivate();
        Ok(true)
    }

    async fn list_active_users(&self) -> Result<Vec<User>, StoreError> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state.users.values().filter(|u| u.active).cloned().collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }

    async fn latest_payment_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Payment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }
}
