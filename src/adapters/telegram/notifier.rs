//! Direct messages through the Bot API.

use std::sync::Arc;

use async_trait::async_trait;

use super::client::{BotApiError, TelegramClient};
use super::types::{InlineKeyboardMarkup, SendMessageRequest};
use crate::domain::foundation::UserId;
use crate::ports::{Delivery, Notifier, NotifyError, OutboundMessage};

/// Descriptions meaning the user cannot be messaged at all.
const UNREACHABLE_MARKERS: &[&str] = &[
    "chat not found",
    "bot was blocked",
    "user is deactivated",
    "bot can't initiate conversation",
];

pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }

    fn is_unreachable(err: &BotApiError) -> bool {
        err.api_code() == Some(403)
            || UNREACHABLE_MARKERS
                .iter()
                .any(|marker| err.description_contains(marker))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(
        &self,
        recipient: UserId,
        message: OutboundMessage,
    ) -> Result<Delivery, NotifyError> {
        let request = SendMessageRequest {
            chat_id: recipient.as_i64(),
            reply_markup: InlineKeyboardMarkup::from_buttons(&message.buttons),
            text: message.text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        match self.client.send_message(&request).await {
            Ok(_) => Ok(Delivery::Delivered),
            Err(err) if Self::is_unreachable(&err) => {
                tracing::info!(user_id = %recipient, error = %err, "User unreachable");
                Ok(Delivery::Unreachable)
            }
            Err(err @ BotApiError::Api { .. }) => Err(NotifyError::Rejected(err.to_string())),
            Err(err) => Err(NotifyError::Transport(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::fake::{spawn, FakeBotApi};
    use super::*;
    use crate::ports::Button;
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;

    async fn notifier(api: FakeBotApi) -> TelegramNotifier {
        let base = spawn(api).await;
        let client = TelegramClient::new(&base, &SecretString::new("1:t".into()), Duration::from_secs(5))
            .unwrap();
        TelegramNotifier::new(Arc::new(client))
    }

    fn sent_message() -> serde_json::Value {
        json!({"ok": true, "result": {"message_id": 1, "chat": {"id": 7, "type": "private"}, "date": 0, "text": "hi"}})
    }

    #[tokio::test]
    async fn sends_html_with_keyboard() {
        let api = FakeBotApi::default();
        api.respond("sendMessage", sent_message());
        let notifier = notifier(api.clone()).await;

        let delivery = notifier
            .send(
                UserId::new(7),
                OutboundMessage::text("<b>Hi</b>").with_button(Button::callback("Help", "help")),
            )
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Delivered);
        let body = &api.calls_to("sendMessage")[0];
        assert_eq!(body["chat_id"], 7);
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["text"], "<b>Hi</b>");
        assert_eq!(body["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "help");
    }

    #[tokio::test]
    async fn plain_message_has_no_markup() {
        let api = FakeBotApi::default();
        api.respond("sendMessage", sent_message());
        let notifier = notifier(api.clone()).await;

        notifier
            .send(UserId::new(7), OutboundMessage::text("hi"))
            .await
            .unwrap();

        assert!(api.calls_to("sendMessage")[0].get("reply_markup").is_none());
    }

    #[tokio::test]
    async fn blocked_bot_is_unreachable() {
        let api = FakeBotApi::default();
        api.respond(
            "sendMessage",
            json!({"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}),
        );
        let notifier = notifier(api).await;

        let delivery = notifier
            .send(UserId::new(7), OutboundMessage::text("hi"))
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Unreachable);
    }

    #[tokio::test]
    async fn missing_chat_is_unreachable() {
        let api = FakeBotApi::default();
        api.respond(
            "sendMessage",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}),
        );
        let notifier = notifier(api).await;

        let delivery = notifier
            .send(UserId::new(7), OutboundMessage::text("hi"))
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Unreachable);
    }

    #[tokio::test]
    async fn other_rejections_are_errors() {
        let api = FakeBotApi::default();
        api.respond(
            "sendMessage",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: can't parse entities"}),
        );
        let notifier = notifier(api).await;

        let err = notifier
            .send(UserId::new(7), OutboundMessage::text("<b>broken"))
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Rejected(_)));
    }
}
