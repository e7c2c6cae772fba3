//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid retry settings")]
    InvalidRetry,

    #[error("Invalid bot token format")]
    InvalidBotToken,

    #[error("Channel id must be a negative chat id")]
    InvalidChannelId,

    #[error("Invalid admin id: {0}")]
    InvalidAdminId(String),

    #[error("{0} must be an https URL")]
    InvalidUrl(&'static str),

    #[error("Long-poll timeout must be at most 50 seconds")]
    InvalidPollTimeout,

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Subscription period must be at least one day")]
    InvalidPeriod,

    #[error("Invalid reminder day: {0}")]
    InvalidReminderDay(String),

    #[error("Invalid sweep interval")]
    InvalidSweepInterval,

    #[error("Invite lifetime must be between 1 and 720 hours")]
    InvalidInviteTtl,
}
