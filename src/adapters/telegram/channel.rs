//! Channel membership through the Bot API.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use super::client::{BotApiError, TelegramClient};
use super::types::CreateInviteLinkRequest;
use crate::domain::foundation::{ChannelId, Timestamp, UserId};
use crate::ports::{ChannelError, ChannelManager, InviteLink, RevokeOutcome};

/// Descriptions Telegram uses when the user is not in the chat.
const NOT_A_MEMBER_MARKERS: &[&str] = &[
    "participant_id_invalid",
    "user_not_participant",
    "user not found",
];

pub struct TelegramChannel {
    client: Arc<TelegramClient>,
    channel_id: ChannelId,
    invite_ttl_hours: i64,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl TelegramChannel {
    pub fn new(
        client: Arc<TelegramClient>,
        channel_id: ChannelId,
        invite_ttl_hours: i64,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            client,
            channel_id,
            invite_ttl_hours,
            clock,
        }
    }

    async fn lift_ban(&self, user_id: UserId) {
        if let Err(err) = self
            .client
            .unban_chat_member(self.channel_id.as_i64(), user_id.as_i64())
            .await
        {
            tracing::warn!(user_id = %user_id, error = %err, "Unban failed");
        }
    }

    fn is_not_a_member(err: &BotApiError) -> bool {
        NOT_A_MEMBER_MARKERS
            .iter()
            .any(|marker| err.description_contains(marker))
    }
}

fn channel_error(err: BotApiError) -> ChannelError {
    match err {
        BotApiError::Api { .. } => ChannelError::Rejected(err.to_string()),
        BotApiError::Transport(_) | BotApiError::InvalidResponse(_) => {
            ChannelError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ChannelManager for TelegramChannel {
    async fn create_single_use_invite(&self, user_id: UserId) -> Result<InviteLink, ChannelError> {
        // A leftover ban would make the link unusable.
        self.lift_ban(user_id).await;

        let expires = Timestamp::from_datetime(self.clock.utc()).plus_hours(self.invite_ttl_hours);
        let link = self
            .client
            .create_chat_invite_link(&CreateInviteLinkRequest {
                chat_id: self.channel_id.as_i64(),
                member_limit: 1,
                expire_date: Some(expires.as_unix_secs()),
            })
            .await
            .map_err(channel_error)?;

        tracing::info!(user_id = %user_id, "Invite link created");
        Ok(InviteLink {
            url: link.invite_link,
            expires_at: link.expire_date.and_then(Timestamp::from_unix_secs),
        })
    }

    async fn revoke_membership(&self, user_id: UserId) -> Result<RevokeOutcome, ChannelError> {
        match self
            .client
            .ban_chat_member(self.channel_id.as_i64(), user_id.as_i64())
            .await
        {
            Ok(_) => {
                // Ban then unban removes the member without blocking a later rejoin.
                self.lift_ban(user_id).await;
                Ok(RevokeOutcome::Revoked)
            }
            Err(err) if Self::is_not_a_member(&err) => {
                tracing::debug!(user_id = %user_id, "User was not in the channel");
                Ok(RevokeOutcome::NotAMember)
            }
            Err(err) => Err(channel_error(err)),
        }
    }

    async fn is_member(&self, user_id: UserId) -> Result<bool, ChannelError> {
        match self
            .client
            .get_chat_member(self.channel_id.as_i64(), user_id.as_i64())
            .await
        {
            Ok(member) => Ok(member.status.is_present()),
            Err(err) if Self::is_not_a_member(&err) => Ok(false),
            Err(err) => Err(channel_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::fake::{spawn, FakeBotApi};
    use super::*;
    use crate::adapters::testing::MutableClock;
    use chrono::{TimeZone, Utc};
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;

    const CHANNEL: ChannelId = ChannelId::new(-100_555);

    async fn channel(api: FakeBotApi) -> (TelegramChannel, Arc<MutableClock>) {
        let base = spawn(api).await;
        let client = TelegramClient::new(&base, &SecretString::new("1:t".into()), Duration::from_secs(5))
            .unwrap();
        let clock = Arc::new(MutableClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()));
        (
            TelegramChannel::new(Arc::new(client), CHANNEL, 24, clock.clone()),
            clock,
        )
    }

    #[tokio::test]
    async fn invite_is_single_use_and_expires_after_ttl() {
        let api = FakeBotApi::default();
        let expires = Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap().timestamp();
        api.respond(
            "createChatInviteLink",
            json!({"ok": true, "result": {"invite_link": "https://t.me/+abc", "expire_date": expires, "member_limit": 1}}),
        );
        let (channel, _clock) = channel(api.clone()).await;

        let invite = channel.create_single_use_invite(UserId::new(7)).await.unwrap();

        assert_eq!(invite.url, "https://t.me/+abc");
        assert_eq!(invite.expires_at.unwrap().as_unix_secs(), expires);
        let body = &api.calls_to("createChatInviteLink")[0];
        assert_eq!(body["chat_id"], -100_555);
        assert_eq!(body["member_limit"], 1);
        assert_eq!(body["expire_date"], expires);
    }

    #[tokio::test]
    async fn revoke_removes_member_without_keeping_the_ban() {
        let api = FakeBotApi::default();
        let (channel, _clock) = channel(api.clone()).await;

        let outcome = channel.revoke_membership(UserId::new(7)).await.unwrap();

        assert_eq!(outcome, RevokeOutcome::Revoked);
        assert_eq!(api.calls_to("banChatMember")[0], json!({"chat_id": -100_555, "user_id": 7}));
        assert_eq!(
            api.calls_to("unbanChatMember"),
            vec![json!({"chat_id": -100_555, "user_id": 7, "only_if_banned": true})]
        );
    }

    #[tokio::test]
    async fn revoke_succeeds_when_unban_fails() {
        let api = FakeBotApi::default();
        api.respond(
            "unbanChatMember",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: not enough rights"}),
        );
        let (channel, _clock) = channel(api.clone()).await;

        let outcome = channel.revoke_membership(UserId::new(7)).await.unwrap();

        assert_eq!(outcome, RevokeOutcome::Revoked);
    }

    #[tokio::test]
    async fn absent_user_is_not_unbanned() {
        let api = FakeBotApi::default();
        api.respond(
            "banChatMember",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: USER_NOT_PARTICIPANT"}),
        );
        let (channel, _clock) = channel(api.clone()).await;

        channel.revoke_membership(UserId::new(7)).await.unwrap();

        assert!(api.calls_to("unbanChatMember").is_empty());
    }

    #[tokio::test]
    async fn invite_lifts_a_previous_ban_first() {
        let api = FakeBotApi::default();
        api.respond(
            "createChatInviteLink",
            json!({"ok": true, "result": {"invite_link": "https://t.me/+again"}}),
        );
        let (channel, _clock) = channel(api.clone()).await;

        channel.revoke_membership(UserId::new(7)).await.unwrap();
        let invite = channel.create_single_use_invite(UserId::new(7)).await.unwrap();

        assert_eq!(invite.url, "https://t.me/+again");
        assert_eq!(api.calls_to("unbanChatMember").len(), 2);
        assert_eq!(api.calls_to("unbanChatMember")[1]["only_if_banned"], true);
    }

    #[tokio::test]
    async fn revoke_of_absent_user_is_not_an_error() {
        let api = FakeBotApi::default();
        api.respond(
            "banChatMember",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: PARTICIPANT_ID_INVALID"}),
        );
        let (channel, _clock) = channel(api).await;

        let outcome = channel.revoke_membership(UserId::new(7)).await.unwrap();

        assert_eq!(outcome, RevokeOutcome::NotAMember);
    }

    #[tokio::test]
    async fn revoke_surfaces_other_rejections() {
        let api = FakeBotApi::default();
        api.respond(
            "banChatMember",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: not enough rights to restrict/unrestrict chat member"}),
        );
        let (channel, _clock) = channel(api).await;

        let err = channel.revoke_membership(UserId::new(7)).await.unwrap_err();

        assert!(matches!(err, ChannelError::Rejected(_)));
    }

    #[tokio::test]
    async fn membership_reflects_status() {
        let api = FakeBotApi::default();
        api.respond(
            "getChatMember",
            json!({"ok": true, "result": {"status": "left", "user": {"id": 7, "first_name": "A"}}}),
        );
        let (channel, _clock) = channel(api).await;

        assert!(!channel.is_member(UserId::new(7)).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_user_is_not_a_member() {
        let api = FakeBotApi::default();
        api.respond(
            "getChatMember",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: user not found"}),
        );
        let (channel, _clock) = channel(api).await;

        assert!(!channel.is_member(UserId::new(7)).await.unwrap());
    }
}
