//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionStore` - Users and payments with row-locked transactions
//! - `RetryPolicy` - Backoff for transient failures (busy, deadlock, pool timeout)

mod retry;
mod subscription_store;

pub use retry::RetryPolicy;
pub use subscription_store::PostgresSubscriptionStore;
