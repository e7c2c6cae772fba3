//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHANNEL_PASS` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use channel_pass::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;
mod subscription;
mod telegram;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};
pub use subscription::SubscriptionConfig;
pub use telegram::TelegramConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Telegram bot and channel
    pub telegram: TelegramConfig,

    /// Payment configuration (YooKassa)
    pub payment: PaymentConfig,

    /// Trial, period, reminders and sweep schedule
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHANNEL_PASS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHANNEL_PASS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHANNEL_PASS__TELEGRAM__ADMIN_IDS=111,222` -> `telegram.admin_ids`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHANNEL_PASS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.telegram.validate()?;
        self.payment.validate()?;
        self.subscription.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL_ENV: &[(&str, &str)] = &[
        ("CHANNEL_PASS__DATABASE__URL", "postgresql://test@localhost/test"),
        ("CHANNEL_PASS__TELEGRAM__BOT_TOKEN", "123456:ABC-DEF"),
        ("CHANNEL_PASS__TELEGRAM__BOT_USERNAME", "pass_bot"),
        ("CHANNEL_PASS__TELEGRAM__CHANNEL_ID", "-1001234567890"),
        ("CHANNEL_PASS__TELEGRAM__COMMUNITY_CHAT_LINK", "https://t.me/club_chat"),
        ("CHANNEL_PASS__TELEGRAM__CHANNEL_PUBLIC_LINK", "https://t.me/club_channel"),
        ("CHANNEL_PASS__TELEGRAM__ADMIN_IDS", "111,222"),
        ("CHANNEL_PASS__PAYMENT__SHOP_ID", "123456"),
        ("CHANNEL_PASS__PAYMENT__SECRET_KEY", "test_secret"),
    ];

    const OPTIONAL_ENV: &[&str] = &[
        "CHANNEL_PASS__SERVER__PORT",
        "CHANNEL_PASS__SERVER__ENVIRONMENT",
        "CHANNEL_PASS__SUBSCRIPTION__TRIAL_DAYS",
        "CHANNEL_PASS__SUBSCRIPTION__REMINDER_DAYS",
    ];

    fn set_minimal_env() {
        for (key, value) in MINIMAL_ENV {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in MINIMAL_ENV {
            env::remove_var(key);
        }
        for key in OPTIONAL_ENV {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.telegram.channel_id, -1001234567890);
        assert_eq!(config.telegram.bot_token.expose_secret(), "123456:ABC-DEF");
        assert_eq!(config.payment.shop_id, "123456");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.telegram.admin_ids().unwrap().len(), 2);
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.payment.price_minor, 100_000);
        assert_eq!(config.payment.currency, "RUB");
        assert_eq!(config.subscription.trial_days, 5);
        assert_eq!(config.subscription.period_days, 30);
        assert_eq!(config.subscription.reminder_days().unwrap(), vec![3, 1]);
    }

    #[test]
    fn test_subscription_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHANNEL_PASS__SUBSCRIPTION__TRIAL_DAYS", "7");
        env::set_var("CHANNEL_PASS__SUBSCRIPTION__REMINDER_DAYS", "5,2,1");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.subscription.trial_days, 7);
        assert_eq!(config.subscription.reminder_days().unwrap(), vec![5, 2, 1]);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHANNEL_PASS__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_missing_bot_token_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("CHANNEL_PASS__TELEGRAM__BOT_TOKEN");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
