//! MembershipChangeHandler - Command handler gating joins to the channel.
//!
//! Anyone holding an invite can join; entitlement is checked when the join
//! is observed. Joiners without entitlement are removed and told why.

use std::sync::Arc;

use crate::application::{now_from, MessageCatalog, OperationalAlerts, SharedClock};
use crate::domain::foundation::{ChannelId, UserId};
use crate::domain::subscription::{
    compute_state, EntitlementState, SubscriptionError, SubscriptionTerms,
};
use crate::ports::{ChannelManager, Delivery, MemberStatus, Notifier, SubscriptionStore};

/// A member's status changed in some chat the bot administers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChangeCommand {
    pub user_id: UserId,
    pub chat_id: ChannelId,
    pub old_status: MemberStatus,
    pub new_status: MemberStatus,
}

impl MembershipChangeCommand {
    /// From absent (left, kicked) to present (member, admin, creator).
    pub fn is_join(&self) -> bool {
        self.old_status.is_absent() && self.new_status.is_present()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChangeResult {
    /// Another chat, or not a join.
    Ignored,
    /// Joined without entitlement and was removed.
    Removed,
    Welcomed { state: EntitlementState },
}

pub struct MembershipChangeHandler {
    store: Arc<dyn SubscriptionStore>,
    channel: Arc<dyn ChannelManager>,
    notifier: Arc<dyn Notifier>,
    alerts: Arc<OperationalAlerts>,
    messages: Arc<MessageCatalog>,
    clock: SharedClock,
    terms: SubscriptionTerms,
    channel_id: ChannelId,
}

impl MembershipChangeHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        channel: Arc<dyn ChannelManager>,
        notifier: Arc<dyn Notifier>,
        alerts: Arc<OperationalAlerts>,
        messages: Arc<MessageCatalog>,
        clock: SharedClock,
        terms: SubscriptionTerms,
        channel_id: ChannelId,
    ) -> Self {
        Self {
            store,
            channel,
            notifier,
            alerts,
            messages,
            clock,
            terms,
            channel_id,
        }
    }

    pub async fn handle(
        &self,
        cmd: MembershipChangeCommand,
    ) -> Result<MembershipChangeResult, SubscriptionError> {
        if cmd.chat_id != self.channel_id || !cmd.is_join() {
            return Ok(MembershipChangeResult::Ignored);
        }

        let now = now_from(&self.clock);
        let state = match self.store.read_user(cmd.user_id).await? {
            Some(user) => compute_state(&user, now, self.terms.trial_days),
            None => EntitlementState::none(),
        };

        if !state.grants_access() {
            tracing::info!(user_id = %cmd.user_id, "Join without entitlement, removing");
            if let Err(e) = self.channel.revoke_membership(cmd.user_id).await {
                tracing::error!(user_id = %cmd.user_id, error = %e, "Failed to remove unentitled joiner");
            }
            if let Err(e) = self
                .notifier
                .send(cmd.user_id, self.messages.join_denied())
                .await
            {
                tracing::warn!(user_id = %cmd.user_id, error = %e, "Join denial not delivered");
            }
            return Ok(MembershipChangeResult::Removed);
        }

        match self
            .notifier
            .send(cmd.user_id, self.messages.joined_welcome(&state))
            .await
        {
            Ok(Delivery::Delivered) => {
                tracing::info!(user_id = %cmd.user_id, "Welcomed new channel member");
            }
            Ok(Delivery::Unreachable) => {
                tracing::info!(user_id = %cmd.user_id, "New member unreachable for welcome");
            }
            Err(e) => {
                tracing::error!(user_id = %cmd.user_id, error = %e, "Welcome message failed");
                self.alerts
                    .alert(self.messages.alert_failure(
                        "welcome message",
                        Some(cmd.user_id),
                        &e.to_string(),
                    ))
                    .await;
            }
        }

        Ok(MembershipChangeResult::Welcomed { state })
    }
}
