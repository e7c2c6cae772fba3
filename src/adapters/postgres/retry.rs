//! Bounded retry for transient database failures.
//!
//! Serialization failures, deadlocks, lock timeouts, pool exhaustion and
//! I/O errors are retried with exponential backoff. Anything else fails
//! on the first attempt.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::ports::StoreError;

/// How many times to try, and how long to wait before the first retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Failure of a single attempt.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Raw driver error, classified for retry.
    Sql(sqlx::Error),

    /// Already a store-level verdict; never retried.
    Store(StoreError),
}

impl From<sqlx::Error> for AttemptError {
    fn from(err: sqlx::Error) -> Self {
        AttemptError::Sql(err)
    }
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        AttemptError::Store(err)
    }
}

/// Whether the error describes contention or connectivity, not a bad query.
pub(crate) fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            // serialization_failure, deadlock_detected, lock_not_available
            Some("40001") | Some("40P01") | Some("55P03")
        ),
        _ => false,
    }
}

/// Runs `attempt` until it succeeds, fails permanently, or the policy's
/// attempts are used up.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Store(err)) => return Err(err),
            Err(AttemptError::Sql(err)) if is_transient(&err) => {
                if tries >= policy.max_attempts {
                    tracing::error!(
                        operation,
                        attempts = tries,
                        error = %err,
                        "Store still busy after retries"
                    );
                    return Err(StoreError::Busy(format!("{}: {}", operation, err)));
                }
                let delay = policy.delay_for(tries);
                tracing::warn!(
                    operation,
                    attempt = tries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient store failure, retrying"
                );
                sleep(delay).await;
            }
            Err(AttemptError::Sql(err)) => {
                tracing::error!(operation, error = %err, "Store operation failed");
                return Err(StoreError::Database(format!("{}: {}", operation, err)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
    }

    #[test]
    fn default_policy_tries_five_times() {
        assert_eq!(RetryPolicy::default().max_attempts, 5);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn pool_timeouts_are_transient() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast_policy(5), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AttemptError::Sql(sqlx::Error::PoolTimedOut))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_as_busy_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast_policy(3), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::Sql(sqlx::Error::PoolTimedOut))
        })
        .await;

        assert!(matches!(result, Err(StoreError::Busy(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast_policy(5), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::Sql(sqlx::Error::RowNotFound))
        })
        .await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_verdicts_pass_through() {
        let result: Result<(), _> = with_retry(&fast_policy(5), "test", || async {
            Err(AttemptError::Store(StoreError::Corrupt("bad row".into())))
        })
        .await;

        assert_eq!(result, Err(StoreError::Corrupt("bad row".into())));
    }
}
