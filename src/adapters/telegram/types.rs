//! Telegram Bot API objects as they appear on the wire.
//!
//! Only the fields the service reads are modelled.

use serde::{Deserialize, Serialize};

use crate::ports::{Button, MemberStatus};

/// Envelope around every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Incoming objects
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
    pub chat_member: Option<ChatMemberUpdated>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

impl TelegramUser {
    /// Username when set, otherwise the first name.
    pub fn display_name(&self) -> Option<String> {
        self.username
            .clone()
            .or_else(|| Some(self.first_name.clone()).filter(|n| !n.is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TelegramUser,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub from: TelegramUser,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: MemberStatus,
    pub user: TelegramUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatInviteLink {
    pub invite_link: String,
    pub expire_date: Option<i64>,
    pub member_limit: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: &'static str,
    pub disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// Lays out buttons: each link on its own row, callbacks two per row.
    /// `None` when there are no buttons.
    pub fn from_buttons(buttons: &[Button]) -> Option<Self> {
        if buttons.is_empty() {
            return None;
        }

        let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
        let mut pending: Vec<InlineKeyboardButton> = Vec::new();

        for button in buttons {
            match button {
                Button::Url { label, url } => {
                    if !pending.is_empty() {
                        rows.push(std::mem::take(&mut pending));
                    }
                    rows.push(vec![InlineKeyboardButton {
                        text: label.clone(),
                        url: Some(url.clone()),
                        callback_data: None,
                    }]);
                }
                Button::Callback { label, data } => {
                    pending.push(InlineKeyboardButton {
                        text: label.clone(),
                        url: None,
                        callback_data: Some(data.clone()),
                    });
                    if pending.len() == 2 {
                        rows.push(std::mem::take(&mut pending));
                    }
                }
            }
        }
        if !pending.is_empty() {
            rows.push(pending);
        }

        Some(Self {
            inline_keyboard: rows,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateInviteLinkRequest {
    pub chat_id: i64,
    pub member_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMemberRequest {
    pub chat_id: i64,
    pub user_id: i64,
}

/// `unbanChatMember` with `only_if_banned`, so a present member is left alone.
#[derive(Debug, Clone, Serialize)]
pub struct UnbanChatMemberRequest {
    pub chat_id: i64,
    pub user_id: i64,
    pub only_if_banned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerCallbackQueryRequest {
    pub callback_query_id: String,
}
