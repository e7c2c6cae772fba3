//! YooKassa payment gateway adapter.
//!
//! Implements `PaymentGateway` over the YooKassa v3 REST API:
//! `POST /payments` with redirect confirmation and immediate capture, and
//! `GET /payments/{id}` for status reconciliation.
//!
//! # Security
//!
//! - HTTP basic auth with the shop id and secret key
//! - Secret key held as `secrecy::SecretString`
//! - Every create carries a fresh `Idempotence-Key`, so a retried request
//!   never produces a second payment

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::PaymentId;
use crate::ports::{
    CreatePaymentRequest, CreatedPayment, GatewayPayment, PaymentError, PaymentErrorCode,
    PaymentGateway,
};

use super::api_types::{
    AmountObject, ConfirmationRequest, CreatePaymentBody, ErrorObject, PaymentObject,
    USER_ID_METADATA_KEY,
};

/// YooKassa API configuration.
#[derive(Clone)]
pub struct YooKassaConfig {
    shop_id: String,
    secret_key: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl YooKassaConfig {
    pub fn new(shop_id: impl Into<String>, secret_key: SecretString) -> Self {
        Self {
            shop_id: shop_id.into(),
            secret_key,
            api_base_url: "https://api.yookassa.ru/v3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// YooKassa payment gateway adapter.
pub struct YooKassaGateway {
    config: YooKassaConfig,
    http_client: reqwest::Client,
}

impl YooKassaGateway {
    pub fn new(config: YooKassaConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.config.api_base_url, path))
            .basic_auth(
                &self.config.shop_id,
                Some(self.config.secret_key.expose_secret()),
            )
    }

    /// Maps a non-2xx response to a `PaymentError`.
    async fn error_from_response(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ErrorObject> = serde_json::from_str(&body).ok();
        let description = parsed
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or(body);

        let code = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                PaymentErrorCode::AuthenticationError
            }
            StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
            s if s.is_client_error() => PaymentErrorCode::InvalidRequest,
            _ => PaymentErrorCode::ProviderError,
        };

        let mut err = PaymentError::new(
            code,
            format!("YooKassa API error ({}): {}", status.as_u16(), description),
        );
        if let Some(provider_code) = parsed.and_then(|e| e.code) {
            err = err.with_provider_code(provider_code);
        }
        err
    }
}

#[async_trait]
impl PaymentGateway for YooKassaGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CreatedPayment, PaymentError> {
        let body = CreatePaymentBody {
            amount: AmountObject::from(&request.amount),
            confirmation: ConfirmationRequest {
                kind: "redirect".to_string(),
                return_url: request.return_url,
            },
            capture: true,
            description: request.description,
            metadata: HashMap::from([(
                USER_ID_METADATA_KEY.to_string(),
                request.user_id.to_string(),
            )]),
        };

        let response = self
            .request(reqwest::Method::POST, "/payments")
            .header("Idempotence-Key", uuid::Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(user_id = %request.user_id, error = %e, "YooKassa create request failed");
                PaymentError::network(e.to_string())
            })?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            tracing::error!(user_id = %request.user_id, error = %err, "YooKassa rejected payment creation");
            return Err(err);
        }

        let payment: PaymentObject = response.json().await.map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse YooKassa response: {}", e))
        })?;

        let confirmation_url = payment
            .confirmation
            .as_ref()
            .and_then(|c| c.confirmation_url.clone())
            .ok_or_else(|| PaymentError::invalid_response("Payment has no confirmation URL"))?;

        tracing::info!(
            user_id = %request.user_id,
            payment_id = %payment.id,
            "Payment created"
        );

        Ok(CreatedPayment {
            payment_id: payment.payment_id()?,
            confirmation_url,
            status: payment.status()?,
        })
    }

    async fn fetch_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<GatewayPayment>, PaymentError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/payments/{}", payment_id.as_str()),
            )
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(payment_id = %payment_id, error = %e, "YooKassa fetch request failed");
                PaymentError::network(e.to_string())
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let payment: PaymentObject = response.json().await.map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse YooKassa response: {}", e))
        })?;

        payment.into_gateway_payment().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::subscription::{Money, PaymentStatus};
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    // ════════════════════════════════════════════════════════════════════════════
    // Fake YooKassa API
    // ════════════════════════════════════════════════════════════════════════════

    #[derive(Clone, Default)]
    struct FakeApi {
        created: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
    }

    async fn create(
        State(api): State<FakeApi>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        api.created.lock().unwrap().push((headers, body.clone()));
        Json(json!({
            "id": "pay-created",
            "status": "pending",
            "amount": body["amount"],
            "confirmation": {"type": "redirect", "confirmation_url": "https://yoomoney.example/confirm/pay-created"},
            "metadata": body["metadata"],
        }))
    }

    async fn fetch(Path(id): Path<String>) -> (axum::http::StatusCode, Json<Value>) {
        match id.as_str() {
            "pay-known" => (
                axum::http::StatusCode::OK,
                Json(json!({
                    "id": "pay-known",
                    "status": "succeeded",
                    "amount": {"value": "1000.00", "currency": "RUB"},
                    "metadata": {"user_id": "42"},
                })),
            ),
            "pay-denied" => (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(json!({"type": "error", "code": "invalid_credentials", "description": "Bad credentials"})),
            ),
            _ => (
                axum::http::StatusCode::NOT_FOUND,
                Json(json!({"type": "error", "code": "not_found", "description": "Not found"})),
            ),
        }
    }

    async fn spawn_fake(api: FakeApi) -> String {
        let app = Router::new()
            .route("/v3/payments", post(create))
            .route("/v3/payments/:id", get(fetch))
            .with_state(api);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v3", addr)
    }

    fn gateway(base_url: String) -> YooKassaGateway {
        let config = YooKassaConfig::new("shop-1", SecretString::new("test_secret".into()))
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5));
        YooKassaGateway::new(config).unwrap()
    }

    #[tokio::test]
    async fn create_payment_sends_redirect_capture_and_metadata() {
        let api = FakeApi::default();
        let base = spawn_fake(api.clone()).await;

        let created = gateway(base)
            .create_payment(CreatePaymentRequest {
                user_id: UserId::new(42),
                amount: Money::new(100_000, "RUB").unwrap(),
                description: "Channel access".into(),
                return_url: "https://t.me/pass_bot?start=payment_42".into(),
            })
            .await
            .unwrap();

        assert_eq!(created.payment_id.as_str(), "pay-created");
        assert_eq!(created.status, PaymentStatus::Pending);
        assert_eq!(
            created.confirmation_url,
            "https://yoomoney.example/confirm/pay-created"
        );

        let calls = api.created.lock().unwrap();
        let (headers, body) = &calls[0];
        assert!(headers.contains_key("idempotence-key"));
        assert!(headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("Basic "))
            .unwrap_or(false));
        assert_eq!(body["amount"]["value"], "1000.00");
        assert_eq!(body["amount"]["currency"], "RUB");
        assert_eq!(body["capture"], true);
        assert_eq!(body["confirmation"]["type"], "redirect");
        assert_eq!(body["metadata"]["user_id"], "42");
    }

    #[tokio::test]
    async fn fetch_payment_reads_status_and_owner() {
        let base = spawn_fake(FakeApi::default()).await;

        let payment = gateway(base)
            .fetch_payment(&PaymentId::new("pay-known").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.owner, Some(UserId::new(42)));
    }

    #[tokio::test]
    async fn fetch_unknown_payment_is_none() {
        let base = spawn_fake(FakeApi::default()).await;

        let payment = gateway(base)
            .fetch_payment(&PaymentId::new("pay-missing").unwrap())
            .await
            .unwrap();

        assert!(payment.is_none());
    }

    #[tokio::test]
    async fn auth_failures_are_not_retryable() {
        let base = spawn_fake(FakeApi::default()).await;

        let err = gateway(base)
            .fetch_payment(&PaymentId::new("pay-denied").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::AuthenticationError);
        assert_eq!(err.provider_code.as_deref(), Some("invalid_credentials"));
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn unreachable_api_is_a_network_error() {
        let err = gateway("http://127.0.0.1:9/v3".to_string())
            .fetch_payment(&PaymentId::new("pay-known").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::NetworkError);
        assert!(err.retryable);
    }
}
