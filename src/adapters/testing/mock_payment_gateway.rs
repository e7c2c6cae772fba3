//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Pre-configured payments returned by `fetch_payment`
//! - Error injection, per method or for the next call
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::subscription::{Money, PaymentStatus};
use crate::ports::{
    CreatePaymentRequest, CreatedPayment, GatewayPayment, PaymentError, PaymentGateway,
};

/// Mock payment gateway for testing.
///
/// Payments created through `create_payment` are remembered as pending and
/// can be moved along with [`MockPaymentGateway::set_status`].
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// let created = gateway.create_payment(request).await?;
/// gateway.set_status(&created.payment_id, PaymentStatus::Succeeded);
/// ```
#[derive(Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    payments: HashMap<PaymentId, GatewayPayment>,
    next_sequence: u32,
    next_error: Option<PaymentError>,
    method_errors: HashMap<String, PaymentError>,
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Registers a payment the gateway will report.
    pub fn put_payment(&self, payment: GatewayPayment) {
        self.inner
            .lock()
            .unwrap()
            .payments
            .insert(payment.payment_id.clone(), payment);
    }

    /// Convenience for `put_payment` with the usual fields.
    pub fn put(&self, payment_id: &str, owner: Option<UserId>, status: PaymentStatus, amount: Money) {
        self.put_payment(GatewayPayment {
            payment_id: PaymentId::new(payment_id).unwrap(),
            status,
            owner,
            amount,
        });
    }

    pub fn set_status(&self, payment_id: &PaymentId, status: PaymentStatus) {
        if let Some(payment) = self.inner.lock().unwrap().payments.get_mut(payment_id) {
            payment.status = status;
        }
    }

    /// Fails the next call, whatever the method.
    pub fn set_error(&self, error: PaymentError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Fails every call to `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        Ok(())
    }
}

impl Clone for MockPaymentGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CreatedPayment, PaymentError> {
        self.record_call(
            "create_payment",
            vec![request.user_id.to_string(), request.amount.to_string()],
        );
        self.check_error("create_payment")?;

        let mut state = self.inner.lock().unwrap();
        state.next_sequence += 1;
        let payment_id = PaymentId::new(format!("pay_mock_{}", state.next_sequence))
            .map_err(|e| PaymentError::invalid_response(e.to_string()))?;

        state.payments.insert(
            payment_id.clone(),
            GatewayPayment {
                payment_id: payment_id.clone(),
                status: PaymentStatus::Pending,
                owner: Some(request.user_id),
                amount: request.amount,
            },
        );

        Ok(CreatedPayment {
            confirmation_url: format!("https://pay.example/confirm/{}", payment_id),
            payment_id,
            status: PaymentStatus::Pending,
        })
    }

    async fn fetch_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<GatewayPayment>, PaymentError> {
        self.record_call("fetch_payment", vec![payment_id.to_string()]);
        self.check_error("fetch_payment")?;

        Ok(self.inner.lock().unwrap().payments.get(payment_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: i64) -> CreatePaymentRequest {
        CreatePaymentRequest {
            user_id: UserId::new(user),
            amount: Money::new(100_000, "RUB").unwrap(),
            description: "Channel access".into(),
            return_url: "https://t.me/bot?start=payment_1".into(),
        }
    }

    #[tokio::test]
    async fn created_payments_can_be_fetched_and_advanced() {
        let gateway = MockPaymentGateway::new();
        let created = gateway.create_payment(request(1)).await.unwrap();

        gateway.set_status(&created.payment_id, PaymentStatus::Succeeded);
        let fetched = gateway.fetch_payment(&created.payment_id).await.unwrap().unwrap();

        assert_eq!(fetched.status, PaymentStatus::Succeeded);
        assert_eq!(fetched.owner, Some(UserId::new(1)));
        assert_eq!(gateway.call_count("create_payment"), 1);
    }

    #[tokio::test]
    async fn next_error_is_consumed_once() {
        let gateway = MockPaymentGateway::new();
        gateway.set_error(PaymentError::network("down"));

        assert!(gateway.create_payment(request(1)).await.is_err());
        assert!(gateway.create_payment(request(1)).await.is_ok());
    }

    #[tokio::test]
    async fn method_errors_persist_until_cleared() {
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error("fetch_payment", PaymentError::provider("boom"));
        let id = PaymentId::new("p1").unwrap();

        assert!(gateway.fetch_payment(&id).await.is_err());
        assert!(gateway.fetch_payment(&id).await.is_err());
        gateway.clear_errors();
        assert_eq!(gateway.fetch_payment(&id).await.unwrap(), None);
    }
}
