//! Channel manager double that records invitations and removals.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::ports::{ChannelError, ChannelManager, InviteLink, RevokeOutcome};

/// In-process channel with a member set.
///
/// `revoke_membership` removes from the set and reports `NotAMember` for
/// users who were never added.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    inner: Arc<Mutex<ChannelState>>,
}

#[derive(Default)]
struct ChannelState {
    members: HashSet<UserId>,
    invites: Vec<UserId>,
    revocations: Vec<UserId>,
    invite_error: Option<ChannelError>,
    revoke_error: Option<ChannelError>,
    membership_error: Option<ChannelError>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, user_id: UserId) {
        self.inner.lock().unwrap().members.insert(user_id);
    }

    pub fn is_present(&self, user_id: UserId) -> bool {
        self.inner.lock().unwrap().members.contains(&user_id)
    }

    /// Users an invite was created for, in order.
    pub fn invites(&self) -> Vec<UserId> {
        self.inner.lock().unwrap().invites.clone()
    }

    /// Users a revocation was requested for, in order.
    pub fn revocations(&self) -> Vec<UserId> {
        self.inner.lock().unwrap().revocations.clone()
    }

    pub fn fail_invites(&self, error: ChannelError) {
        self.inner.lock().unwrap().invite_error = Some(error);
    }

    pub fn fail_revocations(&self, error: ChannelError) {
        self.inner.lock().unwrap().revoke_error = Some(error);
    }

    pub fn fail_membership_queries(&self, error: ChannelError) {
        self.inner.lock().unwrap().membership_error = Some(error);
    }
}

#[async_trait]
impl ChannelManager for RecordingChannel {
    async fn create_single_use_invite(&self, user_id: UserId) -> Result<InviteLink, ChannelError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(error) = state.invite_error.clone() {
            return Err(error);
        }
        state.invites.push(user_id);
        Ok(InviteLink {
            url: format!("https://t.me/+invite_{}_{}", user_id, state.invites.len()),
            expires_at: None,
        })
    }

    async fn revoke_membership(&self, user_id: UserId) -> Result<RevokeOutcome, ChannelError> {
        let mut state = self.inner.lock().unwrap();
        state.revocations.push(user_id);
        if let Some(error) = state.revoke_error.clone() {
            return Err(error);
        }
        if state.members.remove(&user_id) {
            Ok(RevokeOutcome::Revoked)
        } else {
            Ok(RevokeOutcome::NotAMember)
        }
    }

    async fn is_member(&self, user_id: UserId) -> Result<bool, ChannelError> {
        let state = self.inner.lock().unwrap();
        if let Some(error) = state.membership_error.clone() {
            return Err(error);
        }
        Ok(state.members.contains(&user_id))
    }
}
