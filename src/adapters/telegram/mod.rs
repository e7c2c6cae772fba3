//! Telegram Bot API adapter.
//!
//! - [`TelegramChannel`] implements `ChannelManager` for the private channel
//! - [`TelegramNotifier`] implements `Notifier` with HTML direct messages
//! - [`BotDispatcher`] long-polls for updates and routes them to handlers

mod channel;
mod client;
mod dispatcher;
mod notifier;
pub mod types;

pub use channel::TelegramChannel;
pub use client::{BotApiError, TelegramClient};
pub use dispatcher::{BotAction, BotDispatcher, BotEvent, BotRouter, BotServices};
pub use notifier::TelegramNotifier;
