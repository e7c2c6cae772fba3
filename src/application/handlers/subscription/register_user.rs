//! RegisterUserHandler - Command handler for a user's first (or repeated) `/start`.

use std::sync::Arc;

use crate::application::{now_from, SharedClock};
use crate::domain::foundation::UserId;
use crate::domain::subscription::{compute_state, EntitlementState, SubscriptionError, SubscriptionTerms};
use crate::ports::{ChannelManager, InviteLink, SubscriptionStore};

use super::{StartPurchaseCommand, StartPurchaseHandler};

/// Command to register a user.
#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub user_id: UserId,
    pub display_name: Option<String>,
}

/// Result of registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserResult {
    /// True on first contact.
    pub created: bool,
    pub state: EntitlementState,
    /// Present when the user is entitled.
    pub invite: Option<InviteLink>,
    /// Purchase or renewal link, offered to everyone.
    pub purchase_url: String,
}

/// Handler for registration.
///
/// First contact starts the free trial. Entitled users get a fresh
/// single-use invite; everyone gets a purchase link.
pub struct RegisterUserHandler {
    store: Arc<dyn SubscriptionStore>,
    channel: Arc<dyn ChannelManager>,
    purchases: Arc<StartPurchaseHandler>,
    clock: SharedClock,
    terms: SubscriptionTerms,
}

impl RegisterUserHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        channel: Arc<dyn ChannelManager>,
        purchases: Arc<StartPurchaseHandler>,
        clock: SharedClock,
        terms: SubscriptionTerms,
    ) -> Self {
        Self {
            store,
            channel,
            purchases,
            clock,
            terms,
        }
    }

    pub async fn handle(
        &self,
        cmd: RegisterUserCommand,
    ) -> Result<RegisterUserResult, SubscriptionError> {
        let now = now_from(&self.clock);

        let created = self
            .store
            .upsert_user_on_first_contact(cmd.user_id, cmd.display_name.clone(), now)
            .await?;
        if created {
            tracing::info!(user_id = %cmd.user_id, "New user registered");
        }

        let user = self
            .store
            .read_user(cmd.user_id)
            .await?
            .ok_or(SubscriptionError::UserNotFound(cmd.user_id))?;
        let state = compute_state(&user, now, self.terms.trial_days);

        let purchase = self
            .purchases
            .handle(StartPurchaseCommand {
                user_id: cmd.user_id,
                display_name: cmd.display_name,
            })
            .await?;

        let invite = if state.grants_access() {
            Some(self.channel.create_single_use_invite(cmd.user_id).await?)
        } else {
            None
        };

        Ok(RegisterUserResult {
            created,
            state,
            invite,
            purchase_url: purchase.confirmation_url,
        })
    }
}
