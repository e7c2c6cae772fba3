//! Channel management port.
//!
//! Controls who can be a member of the private channel: issues single-use
//! invitations, removes members, and answers membership queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::SubscriptionError;

/// Port for the private channel's membership controls.
#[async_trait]
pub trait ChannelManager: Send + Sync {
    /// Creates an invitation usable by exactly one person.
    async fn create_single_use_invite(&self, user_id: UserId) -> Result<InviteLink, ChannelError>;

    /// Removes the user from the channel and prevents rejoining.
    ///
    /// A user who is not a member yields [`RevokeOutcome::NotAMember`],
    /// not an error.
    async fn revoke_membership(&self, user_id: UserId) -> Result<RevokeOutcome, ChannelError>;

    async fn is_member(&self, user_id: UserId) -> Result<bool, ChannelError>;
}

/// A single-use invitation into the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLink {
    pub url: String,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    NotAMember,
}

/// A member's standing in a chat, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    /// Creator, administrator or plain member.
    pub fn is_present(&self) -> bool {
        matches!(
            self,
            MemberStatus::Creator | MemberStatus::Administrator | MemberStatus::Member
        )
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, MemberStatus::Left | MemberStatus::Kicked)
    }
}

/// Errors from channel management operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The platform refused the request.
    #[error("channel request rejected: {0}")]
    Rejected(String),

    /// The platform could not be reached.
    #[error("channel transport failure: {0}")]
    Transport(String),
}

impl From<ChannelError> for SubscriptionError {
    fn from(err: ChannelError) -> Self {
        SubscriptionError::collaborator("channel", err.to_string())
    }
}
