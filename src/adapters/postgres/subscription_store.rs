//! PostgreSQL implementation of SubscriptionStore.
//!
//! Multi-step writes run in one transaction and take `SELECT ... FOR UPDATE`
//! on the user row first, so writes to one user serialize and the
//! extension and lapse rules always see the committed state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::foundation::{PaymentId, StateMachine, Timestamp, UserId};
use crate::domain::subscription::{
    is_lapsed, next_subscription_end, Money, Payment, PaymentStatus,
    SubscriptionTerms, User,
};
use crate::ports::{ExtensionOutcome, ExtensionRequest, StoreError, SubscriptionStore};

use super::retry::{with_retry, AttemptError, RetryPolicy};

const USER_COLUMNS: &str =
    "user_id, display_name, join_date, trial_used, subscription_end, active";
const PAYMENT_COLUMNS: &str =
    "payment_id, user_id, amount_minor, currency, created_at, status, status_changed_at";

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresSubscriptionStore {
    /// Creates a store with the default retry policy.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Database row representation of a user.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    user_id: i64,
    display_name: Option<String>,
    join_date: DateTime<Utc>,
    trial_used: bool,
    subscription_end: Option<DateTime<Utc>>,
    active: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: UserId::new(row.user_id),
            display_name: row.display_name,
            join_date: Timestamp::from_datetime(row.join_date),
            trial_used: row.trial_used,
            subscription_end: row.subscription_end.map(Timestamp::from_datetime),
            active: row.active,
        }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    payment_id: String,
    user_id: i64,
    amount_minor: i64,
    currency: String,
    created_at: DateTime<Utc>,
    status: String,
    status_changed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::foundation::ValidationError| {
            StoreError::Corrupt(format!("payment {}: {}", row.payment_id, e))
        };
        Ok(Payment {
            payment_id: PaymentId::new(row.payment_id.clone()).map_err(corrupt)?,
            user_id: UserId::new(row.user_id),
            amount: Money::new(row.amount_minor, row.currency.clone()).map_err(corrupt)?,
            created_at: Timestamp::from_datetime(row.created_at),
            status: row.status.parse().map_err(corrupt)?,
            status_changed_at: row.status_changed_at.map(Timestamp::from_datetime),
        })
    }
}

async fn lock_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {} FROM users WHERE user_id = $1 FOR UPDATE",
        USER_COLUMNS
    ))
    .bind(user_id.as_i64())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(User::from))
}

async fn lock_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: &PaymentId,
) -> Result<Option<Payment>, AttemptError> {
    let row: Option<PaymentRow> = sqlx::query_as(&format!(
        "SELECT {} FROM payments WHERE payment_id = $1 FOR UPDATE",
        PAYMENT_COLUMNS
    ))
    .bind(payment_id.as_str())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(Payment::try_from).transpose()?)
}

impl PostgresSubscriptionStore {
    async fn upsert_user_once(
        &self,
        user_id: UserId,
        display_name: Option<&str>,
        now: Timestamp,
    ) -> Result<bool, AttemptError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, join_date, trial_used, subscription_end, active)
            VALUES ($1, $2, $3, FALSE, NULL, TRUE)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_i64())
        .bind(display_name)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn read_user_once(&self, user_id: UserId) -> Result<Option<User>, AttemptError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create_pending_once(&self, payment: &Payment) -> Result<bool, AttemptError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (payment_id, user_id, amount_minor, currency, created_at, status, status_changed_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', NULL)
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(payment.payment_id.as_str())
        .bind(payment.user_id.as_i64())
        .bind(payment.amount.amount_minor())
        .bind(payment.amount.currency())
        .bind(payment.created_at.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn read_payment_once(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<Payment>, AttemptError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE payment_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(payment_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Payment::try_from).transpose()?)
    }

    async fn update_status_once(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Result<bool, AttemptError> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = lock_payment(&mut tx, payment_id).await? else {
            tx.rollback().await?;
            return Ok(false);
        };
        if !current.status.can_transition_to(&status) {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE payments SET status = $2, status_changed_at = $3 WHERE payment_id = $1")
            .bind(payment_id.as_str())
            .bind(status.as_str())
            .bind(now.as_datetime())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn apply_extension_once(
        &self,
        request: &ExtensionRequest,
    ) -> Result<ExtensionOutcome, AttemptError> {
        let mut tx = self.pool.begin().await?;

        // User lock first: concurrent confirmations of one payment queue here
        // and the loser then sees the payment already succeeded.
        let Some(mut user) = lock_user(&mut tx, request.user_id).await? else {
            tx.rollback().await?;
            return Ok(ExtensionOutcome::UserNotFound);
        };

        if let Some(payment) = lock_payment(&mut tx, &request.payment_id).await? {
            if !payment.is_owned_by(request.user_id) {
                tx.rollback().await?;
                return Ok(ExtensionOutcome::OwnershipMismatch);
            }
            if payment.status.is_succeeded() {
                tx.rollback().await?;
                return Ok(ExtensionOutcome::AlreadyApplied {
                    subscription_end: user.subscription_end,
                });
            }
            if !payment.status.can_transition_to(&PaymentStatus::Succeeded) {
                tx.rollback().await?;
                return Ok(ExtensionOutcome::StatusConflict {
                    status: payment.status,
                });
            }
        }

        let new_end = next_subscription_end(&user, request.now, &request.terms);
        user.apply_extension(new_end);

        sqlx::query(
            "UPDATE users SET subscription_end = $2, active = $3, trial_used = $4 WHERE user_id = $1",
        )
        .bind(user.user_id.as_i64())
        .bind(new_end.as_datetime())
        .bind(user.active)
        .bind(user.trial_used)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, user_id, amount_minor, currency, created_at, status, status_changed_at)
            VALUES ($1, $2, $3, $4, $5, 'succeeded', $5)
            ON CONFLICT (payment_id) DO UPDATE
            SET status = 'succeeded', status_changed_at = EXCLUDED.status_changed_at
            "#,
        )
        .bind(request.payment_id.as_str())
        .bind(request.user_id.as_i64())
        .bind(request.amount.amount_minor())
        .bind(request.amount.currency())
        .bind(request.now.as_datetime())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ExtensionOutcome::Applied { new_end })
    }

    async fn deactivate_once(&self, user_id: UserId) -> Result<bool, AttemptError> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn deactivate_if_lapsed_once(
        &self,
        user_id: UserId,
        now: Timestamp,
        terms: SubscriptionTerms,
    ) -> Result<bool, AttemptError> {
        let mut tx = self.pool.begin().await?;

        let Some(user) = lock_user(&mut tx, user_id).await? else {
            tx.rollback().await?;
            return Ok(false);
        };
        if !user.active || !is_lapsed(&user, now, terms.trial_days) {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET active = FALSE WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_active_once(&self) -> Result<Vec<User>, AttemptError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE active ORDER BY user_id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn latest_payment_once(&self, user_id: UserId) -> Result<Option<Payment>, AttemptError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Payment::try_from).transpose()?)
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn upsert_user_on_first_contact(
        &self,
        user_id: UserId,
        display_name: Option<String>,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let name = display_name.as_deref();
        with_retry(&self.retry, "upsert_user", || {
            self.upsert_user_once(user_id, name, now)
        })
        .await
    }

    async fn read_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        with_retry(&self.retry, "read_user", || self.read_user_once(user_id)).await
    }

    async fn create_pending_payment(&self, payment: &Payment) -> Result<bool, StoreError> {
        with_retry(&self.retry, "create_pending_payment", || {
            self.create_pending_once(payment)
        })
        .await
    }

    async fn read_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        with_retry(&self.retry, "read_payment", || {
            self.read_payment_once(payment_id)
        })
        .await
    }

    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        with_retry(&self.retry, "update_payment_status", || {
            self.update_status_once(payment_id, status, now)
        })
        .await
    }

    async fn apply_subscription_extension(
        &self,
        request: ExtensionRequest,
    ) -> Result<ExtensionOutcome, StoreError> {
        let outcome = with_retry(&self.retry, "apply_subscription_extension", || {
            self.apply_extension_once(&request)
        })
        .await?;

        tracing::debug!(
            user_id = %request.user_id,
            payment_id = %request.payment_id,
            outcome = ?outcome,
            "Subscription extension processed"
        );
        Ok(outcome)
    }

    async fn deactivate_user(&self, user_id: UserId) -> Result<bool, StoreError> {
        with_retry(&self.retry, "deactivate_user", || self.deactivate_once(user_id)).await
    }

    async fn deactivate_if_lapsed(
        &self,
        user_id: UserId,
        now: Timestamp,
        terms: SubscriptionTerms,
    ) -> Result<bool, StoreError> {
        with_retry(&self.retry, "deactivate_if_lapsed", || {
            self.deactivate_if_lapsed_once(user_id, now, terms)
        })
        .await
    }

    async fn list_active_users(&self) -> Result<Vec<User>, StoreError> {
        with_retry(&self.retry, "list_active_users", || self.list_active_once()).await
    }

    async fn latest_payment_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Payment>, StoreError> {
        with_retry(&self.retry, "latest_payment_for_user", || {
            self.latest_payment_once(user_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_row(status: &str, currency: &str) -> PaymentRow {
        PaymentRow {
            payment_id: "2d8f-000f".to_string(),
            user_id: 42,
            amount_minor: 100_000,
            currency: currency.to_string(),
            created_at: Utc::now(),
            status: status.to_string(),
            status_changed_at: None,
        }
    }

    #[test]
    fn payment_row_maps_to_domain() {
        let payment = Payment::try_from(payment_row("waiting_for_capture", "RUB")).unwrap();
        assert_eq!(payment.status, PaymentStatus::WaitingForCapture);
        assert_eq!(payment.user_id, UserId::new(42));
        assert_eq!(payment.amount.amount_minor(), 100_000);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let err = Payment::try_from(payment_row("refunded", "RUB")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn bad_currency_is_corrupt() {
        let err = Payment::try_from(payment_row("pending", "RUBLES")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn user_row_maps_to_domain() {
        let now = Utc::now();
        let user = User::from(UserRow {
            user_id: 7,
            display_name: Some("alice".into()),
            join_date: now,
            trial_used: true,
            subscription_end: None,
            active: false,
        });
        assert_eq!(user.user_id, UserId::new(7));
        assert_eq!(user.join_date, Timestamp::from_datetime(now));
        assert!(user.trial_used);
        assert!(!user.active);
    }
}
