//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Durable `SubscriptionStore` over sqlx
//! - `memory` - In-process `SubscriptionStore` with the same semantics
//! - `yookassa` - `PaymentGateway` over the YooKassa REST API
//! - `telegram` - `ChannelManager`, `Notifier` and the bot dispatcher
//! - `http` - Payment notification webhook and health probe
//! - `testing` - Recording doubles for tests

pub mod http;
pub mod memory;
pub mod postgres;
pub mod telegram;
pub mod testing;
pub mod yookassa;

pub use memory::InMemorySubscriptionStore;
pub use postgres::PostgresSubscriptionStore;
pub use telegram::{
    BotDispatcher, BotRouter, BotServices, TelegramChannel, TelegramClient, TelegramNotifier,
};
pub use yookassa::{YooKassaConfig, YooKassaGateway};
