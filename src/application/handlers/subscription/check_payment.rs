//! CheckPaymentHandler - Query handler for the user's latest payment.
//!
//! An unfinished payment is reconciled with the gateway on the way, so a
//! payer who returns before the notification arrives still gets access.

use std::sync::Arc;

use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::domain::subscription::{PaymentStatus, SubscriptionError};
use crate::ports::SubscriptionStore;

use super::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};

#[derive(Debug, Clone)]
pub struct CheckPaymentQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckPaymentResult {
    NoPayments,
    /// Confirmed by this check; the user has already been sent an invite.
    Confirmed {
        payment_id: PaymentId,
        new_end: Timestamp,
    },
    /// Succeeded earlier.
    Succeeded { payment_id: PaymentId },
    Pending { payment_id: PaymentId },
    Failed {
        payment_id: PaymentId,
        status: PaymentStatus,
    },
}

pub struct CheckPaymentHandler {
    store: Arc<dyn SubscriptionStore>,
    confirm: Arc<ConfirmPaymentHandler>,
}

impl CheckPaymentHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>, confirm: Arc<ConfirmPaymentHandler>) -> Self {
        Self { store, confirm }
    }

    pub async fn handle(
        &self,
        query: CheckPaymentQuery,
    ) -> Result<CheckPaymentResult, SubscriptionError> {
        let Some(latest) = self.store.latest_payment_for_user(query.user_id).await? else {
            return Ok(CheckPaymentResult::NoPayments);
        };
        let payment_id = latest.payment_id;

        match latest.status {
            PaymentStatus::Succeeded => return Ok(CheckPaymentResult::Succeeded { payment_id }),
            PaymentStatus::Canceled => {
                return Ok(CheckPaymentResult::Failed {
                    payment_id,
                    status: PaymentStatus::Canceled,
                })
            }
            PaymentStatus::Pending | PaymentStatus::WaitingForCapture => {}
        }

        let result = self
            .confirm
            .handle(ConfirmPaymentCommand {
                payment_id: payment_id.clone(),
                user_id: query.user_id,
            })
            .await?;

        Ok(match result {
            ConfirmPaymentResult::Applied { new_end, .. } => {
                CheckPaymentResult::Confirmed { payment_id, new_end }
            }
            ConfirmPaymentResult::AlreadyApplied { .. } => {
                CheckPaymentResult::Succeeded { payment_id }
            }
            ConfirmPaymentResult::NotSucceeded(PaymentStatus::Canceled) => {
                CheckPaymentResult::Failed {
                    payment_id,
                    status: PaymentStatus::Canceled,
                }
            }
            ConfirmPaymentResult::NotSucceeded(_) | ConfirmPaymentResult::NotFound => {
                CheckPaymentResult::Pending { payment_id }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::subscription::test_support::Fixture;
    use crate::domain::subscription::{Payment, User};

    fn query(id: i64) -> CheckPaymentQuery {
        CheckPaymentQuery {
            user_id: UserId::new(id),
        }
    }

    async fn seed(fx: &Fixture, stored: PaymentStatus, remote: Option<PaymentStatus>) -> PaymentId {
        let id = PaymentId::new("p1").unwrap();
        fx.store
            .put_user(User::register(UserId::new(1), None, fx.now()))
            .await;
        let mut payment = Payment::pending(id.clone(), UserId::new(1), fx.price(), fx.now());
        payment.status = stored;
        fx.store.put_payment(payment).await;
        if let Some(status) = remote {
            fx.gateway.put("p1", Some(UserId::new(1)), status, fx.price());
        }
        id
    }

    #[tokio::test]
    async fn no_payments() {
        let fx = Fixture::new();
        assert_eq!(
            fx.check_payment().handle(query(1)).await.unwrap(),
            CheckPaymentResult::NoPayments
        );
    }

    #[tokio::test]
    async fn pending_payment_that_succeeded_remotely_is_confirmed() {
        let fx = Fixture::new();
        let id = seed(&fx, PaymentStatus::Pending, Some(PaymentStatus::Succeeded)).await;

        let result = fx.check_payment().handle(query(1)).await.unwrap();

        assert!(matches!(
            result,
            CheckPaymentResult::Confirmed { payment_id, .. } if payment_id == id
        ));
        assert_eq!(fx.channel.invites(), vec![UserId::new(1)]);
    }

    #[tokio::test]
    async fn still_pending_remotely() {
        let fx = Fixture::new();
        let id = seed(&fx, PaymentStatus::Pending, Some(PaymentStatus::Pending)).await;

        let result = fx.check_payment().handle(query(1)).await.unwrap();

        assert_eq!(result, CheckPaymentResult::Pending { payment_id: id });
    }

    #[tokio::test]
    async fn canceled_remotely_is_failed() {
        let fx = Fixture::new();
        let id = seed(&fx, PaymentStatus::Pending, Some(PaymentStatus::Canceled)).await;

        let result = fx.check_payment().handle(query(1)).await.unwrap();

        assert_eq!(
            result,
            CheckPaymentResult::Failed {
                payment_id: id,
                status: PaymentStatus::Canceled
            }
        );
    }

    #[tokio::test]
    async fn settled_payments_skip_the_gateway() {
        let fx = Fixture::new();
        let id = seed(&fx, PaymentStatus::Succeeded, None).await;

        let result = fx.check_payment().handle(query(1)).await.unwrap();

        assert_eq!(result, CheckPaymentResult::Succeeded { payment_id: id });
        assert_eq!(fx.gateway.call_count("fetch_payment"), 0);
    }
}
