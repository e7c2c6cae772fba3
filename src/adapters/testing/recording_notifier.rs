//! Notifier double that keeps every message it is asked to send.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::ports::{Delivery, Notifier, NotifyError, OutboundMessage};

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<NotifierState>>,
}

#[derive(Default)]
struct NotifierState {
    sent: Vec<(UserId, OutboundMessage)>,
    unreachable: HashSet<UserId>,
    failing: HashSet<UserId>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages to this recipient report `Delivery::Unreachable`.
    pub fn mark_unreachable(&self, user_id: UserId) {
        self.inner.lock().unwrap().unreachable.insert(user_id);
    }

    /// Messages to this recipient fail with a transport error.
    pub fn fail_for(&self, user_id: UserId) {
        self.inner.lock().unwrap().failing.insert(user_id);
    }

    /// Every delivered message, in order.
    pub fn sent(&self) -> Vec<(UserId, OutboundMessage)> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn sent_to(&self, user_id: UserId) -> Vec<OutboundMessage> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(recipient, _)| *recipient == user_id)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().sent.clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: UserId,
        message: OutboundMessage,
    ) -> Result<Delivery, NotifyError> {
        let mut state = self.inner.lock().unwrap();
        if state.failing.contains(&recipient) {
            return Err(NotifyError::Transport("simulated failure".into()));
        }
        if state.unreachable.contains(&recipient) {
            return Ok(Delivery::Unreachable);
        }
        state.sent.push((recipient, message));
        Ok(Delivery::Delivered)
    }
}
