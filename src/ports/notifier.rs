//! Notifier port for direct messages to users and operators.
//!
//! An unreachable recipient (blocked the bot, never started a chat) is a
//! normal outcome, reported as [`Delivery::Unreachable`] and never retried.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;
use crate::domain::subscription::SubscriptionError;

/// Port for sending messages to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: UserId, message: OutboundMessage)
        -> Result<Delivery, NotifyError>;
}

/// A message with optional inline buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundMessage {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    /// Every URL carried by the message's buttons.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().filter_map(|b| match b {
            Button::Url { url, .. } => Some(url.as_str()),
            Button::Callback { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Opens a link.
    Url { label: String, url: String },

    /// Sends `data` back to the bot when pressed.
    Callback { label: String, data: String },
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Button::Url {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Button::Callback {
            label: label.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("messaging transport failure: {0}")]
    Transport(String),
}

impl From<NotifyError> for SubscriptionError {
    fn from(err: NotifyError) -> Self {
        SubscriptionError::collaborator("notifier", err.to_string())
    }
}
