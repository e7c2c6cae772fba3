//! In-memory adapters for tests and database-less local runs.

mod subscription_store;

pub use subscription_store::InMemorySubscriptionStore;
