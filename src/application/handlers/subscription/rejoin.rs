//! RejoinHandler - Query handler for users returning to the channel.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::subscription::SubscriptionError;
use crate::ports::ChannelManager;

use super::{CheckAccessHandler, CheckAccessResult};

#[derive(Debug, Clone)]
pub struct RejoinQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejoinResult {
    /// Entitled and still in the channel; no new link issued.
    AlreadyMember,
    Access(CheckAccessResult),
}

/// Handler for rejoin requests.
///
/// Behaves like an access check, except that an entitled user who is still
/// a member is told so instead of receiving another invite. A failed
/// membership lookup falls through to issuing the invite.
pub struct RejoinHandler {
    access: Arc<CheckAccessHandler>,
    channel: Arc<dyn ChannelManager>,
}

impl RejoinHandler {
    pub fn new(access: Arc<CheckAccessHandler>, channel: Arc<dyn ChannelManager>) -> Self {
        Self { access, channel }
    }

    pub async fn handle(&self, query: RejoinQuery) -> Result<RejoinResult, SubscriptionError> {
        let state = self.access.entitlement(query.user_id).await?;

        if state.grants_access() {
            match self.channel.is_member(query.user_id).await {
                Ok(true) => return Ok(RejoinResult::AlreadyMember),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(user_id = %query.user_id, error = %e, "Membership lookup failed");
                }
            }
        }

        Ok(RejoinResult::Access(
            self.access.grant(query.user_id, state).await?,
        ))
    }
}
