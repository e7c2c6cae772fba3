//! Telegram bot configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::foundation::{ChannelId, UserId};

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token from BotFather
    pub bot_token: SecretString,

    /// Bot username without `@`, used in payment return links
    pub bot_username: String,

    /// Numeric id of the private channel (negative, `-100...`)
    pub channel_id: i64,

    /// Link to the community chat shown in menus
    pub community_chat_link: String,

    /// Public link to the channel, shown when no invite is issued
    pub channel_public_link: String,

    /// Operator user ids (comma-separated); they receive alerts and admin commands
    #[serde(default)]
    pub admin_ids: String,

    /// Bot API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Long-poll timeout for `getUpdates` in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl TelegramConfig {
    pub fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.channel_id)
    }

    /// Get operator ids as a vector
    pub fn admin_ids(&self) -> Result<Vec<UserId>, ValidationError> {
        self.admin_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<UserId>()
                    .map_err(|_| ValidationError::InvalidAdminId(s.to_string()))
            })
            .collect()
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// HTTP timeout for Bot API calls; must outlast a long poll.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs + 10)
    }

    /// Validate Telegram configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let token = self.bot_token.expose_secret();
        if token.is_empty() {
            return Err(ValidationError::MissingRequired("TELEGRAM_BOT_TOKEN"));
        }
        if !token.contains(':') {
            return Err(ValidationError::InvalidBotToken);
        }
        if self.bot_username.trim().is_empty() || self.bot_username.starts_with('@') {
            return Err(ValidationError::MissingRequired("TELEGRAM_BOT_USERNAME"));
        }
        if self.channel_id >= 0 {
            return Err(ValidationError::InvalidChannelId);
        }
        if !self.community_chat_link.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("community_chat_link"));
        }
        if !self.channel_public_link.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("channel_public_link"));
        }
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("api_base_url"));
        }
        if self.poll_timeout_secs > 50 {
            return Err(ValidationError::InvalidPollTimeout);
        }
        self.admin_ids()?;
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TelegramConfig {
        TelegramConfig {
            bot_token: SecretString::new("123456:ABC-DEF".to_string()),
            bot_username: "pass_bot".to_string(),
            channel_id: -1001234567890,
            community_chat_link: "https://t.me/club_chat".to_string(),
            channel_public_link: "https://t.me/club_channel".to_string(),
            admin_ids: "111, 222".to_string(),
            api_base_url: default_api_base_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_admin_ids_parsing() {
        assert_eq!(
            valid().admin_ids().unwrap(),
            vec![UserId::new(111), UserId::new(222)]
        );
    }

    #[test]
    fn test_empty_admin_ids() {
        let config = TelegramConfig {
            admin_ids: String::new(),
            ..valid()
        };
        assert!(config.admin_ids().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_admin_id() {
        let config = TelegramConfig {
            admin_ids: "111,bob".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidAdminId("bob".to_string()))
        );
    }

    #[test]
    fn test_token_without_separator() {
        let config = TelegramConfig {
            bot_token: SecretString::new("garbage".to_string()),
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidBotToken));
    }

    #[test]
    fn test_positive_channel_id() {
        let config = TelegramConfig {
            channel_id: 42,
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidChannelId));
    }

    #[test]
    fn test_poll_timeout_limit() {
        let config = TelegramConfig {
            poll_timeout_secs: 90,
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidPollTimeout));
    }

    #[test]
    fn test_request_timeout_exceeds_poll() {
        let config = valid();
        assert!(config.request_timeout() > config.poll_timeout());
    }

    #[test]
    fn test_debug_hides_token() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("ABC-DEF"));
    }
}
