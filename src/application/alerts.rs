//! Operator alert fan-out.
//!
//! Alerts go to every configured operator through the `Notifier`. Delivery
//! is best-effort: a failed alert is logged and never fails the caller.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::ports::{Delivery, Notifier, OutboundMessage};

pub struct OperationalAlerts {
    notifier: Arc<dyn Notifier>,
    recipients: Vec<UserId>,
}

impl OperationalAlerts {
    pub fn new(notifier: Arc<dyn Notifier>, recipients: Vec<UserId>) -> Self {
        Self {
            notifier,
            recipients,
        }
    }

    /// Whether `user_id` is one of the operators.
    pub fn is_operator(&self, user_id: UserId) -> bool {
        self.recipients.contains(&user_id)
    }

    pub fn recipients(&self) -> &[UserId] {
        &self.recipients
    }

    /// Sends `text` to every operator. Returns how many received it.
    pub async fn alert(&self, text: impl Into<String>) -> usize {
        let text = text.into();
        let mut delivered = 0;

        for &recipient in &self.recipients {
            match self
                .notifier
                .send(recipient, OutboundMessage::text(text.clone()))
                .await
            {
                Ok(Delivery::Delivered) => delivered += 1,
                Ok(Delivery::Unreachable) => {
                    tracing::warn!(operator = %recipient, "Operator unreachable for alert");
                }
                Err(e) => {
                    tracing::error!(operator = %recipient, error = %e, "Failed to deliver operator alert");
                }
            }
        }

        delivered
    }
}
