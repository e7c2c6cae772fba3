//! Channel Pass - Subscription-gated access to a private Telegram channel
//!
//! Users get a free trial, then pay through YooKassa for 30-day periods that
//! stack. A background sweeper reminds users before expiry and removes them
//! from the channel once access lapses.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
