//! StartPurchaseHandler - Command handler that opens a payment for one period.

use std::sync::Arc;

use crate::application::{now_from, SharedClock};
use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::subscription::{Money, Payment, SubscriptionError};
use crate::ports::{CreatePaymentRequest, PaymentGateway, SubscriptionStore};

/// What one purchase costs and where the payer returns afterwards.
#[derive(Debug, Clone)]
pub struct PurchaseSettings {
    pub price: Money,
    pub description: String,
    pub bot_username: String,
}

impl PurchaseSettings {
    /// Deep link back into the bot that triggers a payment check.
    pub fn return_url(&self, user_id: UserId) -> String {
        format!(
            "https://t.me/{}?start=payment_{}",
            self.bot_username, user_id
        )
    }
}

/// Command to start a purchase.
#[derive(Debug, Clone)]
pub struct StartPurchaseCommand {
    pub user_id: UserId,
    pub display_name: Option<String>,
}

/// A payment awaiting the payer's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPurchaseResult {
    pub payment_id: PaymentId,
    pub confirmation_url: String,
}

/// Handler for starting purchases.
///
/// Creates the payment with the gateway, then records it as pending. The
/// user row is ensured first because payments reference it.
pub struct StartPurchaseHandler {
    store: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: SharedClock,
    settings: PurchaseSettings,
}

impl StartPurchaseHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: SharedClock,
        settings: PurchaseSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &PurchaseSettings {
        &self.settings
    }

    pub async fn handle(
        &self,
        cmd: StartPurchaseCommand,
    ) -> Result<StartPurchaseResult, SubscriptionError> {
        let now = now_from(&self.clock);

        self.store
            .upsert_user_on_first_contact(cmd.user_id, cmd.display_name, now)
            .await?;

        let created = self
            .gateway
            .create_payment(CreatePaymentRequest {
                user_id: cmd.user_id,
                amount: self.settings.price.clone(),
                description: self.settings.description.clone(),
                return_url: self.settings.return_url(cmd.user_id),
            })
            .await?;

        let payment = Payment::pending(
            created.payment_id.clone(),
            cmd.user_id,
            self.settings.price.clone(),
            now,
        );
        self.store.create_pending_payment(&payment).await?;

        tracing::info!(
            user_id = %cmd.user_id,
            payment_id = %created.payment_id,
            "Purchase started"
        );

        Ok(StartPurchaseResult {
            payment_id: created.payment_id,
            confirmation_url: created.confirmation_url,
        })
    }

    /// Best-effort purchase link for messages that are still useful without
    /// one. Failures are logged and yield `None`.
    pub async fn purchase_link(&self, user_id: UserId) -> Option<String> {
        match self
            .handle(StartPurchaseCommand {
                user_id,
                display_name: None,
            })
            .await
        {
            Ok(result) => Some(result.confirmation_url),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not create purchase link");
                None
            }
        }
    }
}
