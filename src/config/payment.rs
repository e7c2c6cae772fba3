//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::subscription::Money;

/// Payment configuration (YooKassa)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// YooKassa shop id
    pub shop_id: String,

    /// YooKassa secret key
    pub secret_key: SecretString,

    /// Price of one period in minor units (kopecks)
    #[serde(default = "default_price_minor")]
    pub price_minor: i64,

    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Payment description shown on the checkout page
    #[serde(default = "default_description")]
    pub description: String,

    /// YooKassa API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// HTTP timeout for gateway calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PaymentConfig {
    /// Price of one period
    pub fn price(&self) -> Result<Money, ValidationError> {
        Money::new(self.price_minor, self.currency.clone())
            .map_err(|e| ValidationError::InvalidPrice(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.shop_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT_SHOP_ID"));
        }
        if self.secret_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT_SECRET_KEY"));
        }
        if self.price_minor <= 0 {
            return Err(ValidationError::InvalidPrice(
                "price must be positive".to_string(),
            ));
        }
        self.price()?;
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("payment api_base_url"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_price_minor() -> i64 {
    100_000
}

fn default_currency() -> String {
    "RUB".to_string()
}

fn default_description() -> String {
    "Channel access, 30 days".to_string()
}

fn default_api_base_url() -> String {
    "https://api.yookassa.ru/v3".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
