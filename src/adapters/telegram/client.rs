//! Minimal Telegram Bot API client over `reqwest`.
//!
//! Every method is a JSON POST to `{base}/bot{token}/{method}`. The token
//! is part of the URL, so URLs are stripped from transport errors before
//! they are logged.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::types::{
    AnswerCallbackQueryRequest, ApiResponse, ChatInviteLink, ChatMember, ChatMemberRequest,
    CreateInviteLinkRequest, GetUpdatesRequest, Message, SendMessageRequest, UnbanChatMemberRequest,
    Update,
};

/// Errors from Bot API calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotApiError {
    /// Telegram answered with `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Telegram transport failure: {0}")]
    Transport(String),

    #[error("invalid Telegram response: {0}")]
    InvalidResponse(String),
}

impl BotApiError {
    /// Case-insensitive match on the API error description.
    pub fn description_contains(&self, needle: &str) -> bool {
        match self {
            BotApiError::Api { description, .. } => description
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
            _ => false,
        }
    }

    pub fn api_code(&self) -> Option<i64> {
        match self {
            BotApiError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Another process is polling with the same token.
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }
}

pub struct TelegramClient {
    http_client: reqwest::Client,
    endpoint: SecretString,
}

impl TelegramClient {
    /// `request_timeout` must exceed the long-poll timeout.
    pub fn new(
        api_base_url: &str,
        bot_token: &SecretString,
        request_timeout: Duration,
    ) -> Result<Self, BotApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BotApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        let endpoint = SecretString::new(format!(
            "{}/bot{}",
            api_base_url.trim_end_matches('/'),
            bot_token.expose_secret()
        ));
        Ok(Self {
            http_client,
            endpoint,
        })
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, BotApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint.expose_secret(), method);
        let response = self
            .http_client
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|e| BotApiError::Transport(e.without_url().to_string()))?;

        let envelope: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| BotApiError::InvalidResponse(e.without_url().to_string()))?;

        if !envelope.ok {
            return Err(BotApiError::Api {
                code: envelope.error_code.unwrap_or_default(),
                description: envelope.description.unwrap_or_default(),
            });
        }
        envelope
            .result
            .ok_or_else(|| BotApiError::InvalidResponse(format!("{} returned no result", method)))
    }

    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<Message, BotApiError> {
        self.call("sendMessage", request).await
    }

    pub async fn create_chat_invite_link(
        &self,
        request: &CreateInviteLinkRequest,
    ) -> Result<ChatInviteLink, BotApiError> {
        self.call("createChatInviteLink", request).await
    }

    pub async fn ban_chat_member(&self, chat_id: i64, user_id: i64) -> Result<bool, BotApiError> {
        self.call("banChatMember", &ChatMemberRequest { chat_id, user_id })
            .await
    }

    /// Lifts a ban so the user can join again through an invite link.
    pub async fn unban_chat_member(&self, chat_id: i64, user_id: i64) -> Result<bool, BotApiError> {
        self.call(
            "unbanChatMember",
            &UnbanChatMemberRequest {
                chat_id,
                user_id,
                only_if_banned: true,
            },
        )
        .await
    }

    pub async fn get_chat_member(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatMember, BotApiError> {
        self.call("getChatMember", &ChatMemberRequest { chat_id, user_id })
            .await
    }

    /// Long-polls for updates, including `chat_member` changes (which
    /// Telegram only delivers when asked for explicitly).
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, BotApiError> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: timeout.as_secs(),
                allowed_updates: vec!["message", "callback_query", "chat_member"],
            },
        )
        .await
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<bool, BotApiError> {
        self.call(
            "answerCallbackQuery",
            &AnswerCallbackQueryRequest {
                callback_query_id: callback_query_id.to_string(),
            },
        )
        .await
    }
}
