//! ConfirmPaymentHandler - Command handler that turns a succeeded payment
//! into one more paid period.
//!
//! The gateway is the only source of truth for status and owner; callers
//! (payment notifications, the return deep link, `/check_payment`) only
//! name the payment.
//!
//! ## Flow
//!
//! 1. Fetch from the gateway; unknown → `NotFound`
//! 2. Owner must match both the gateway metadata and any stored row
//! 3. Stored row already succeeded → `AlreadyApplied`
//! 4. Gateway status not succeeded → record it, `NotSucceeded`
//! 5. Apply the extension atomically in the store
//! 6. After commit, best-effort: fresh invite to the user, operator alert

use std::sync::Arc;

use crate::application::{now_from, MessageCatalog, OperationalAlerts, SharedClock};
use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::domain::subscription::{PaymentStatus, SubscriptionError, SubscriptionTerms};
use crate::ports::{
    ChannelManager, ExtensionOutcome, ExtensionRequest, GatewayPayment, InviteLink, Notifier,
    PaymentGateway, SubscriptionStore,
};

/// Command to confirm a payment on behalf of a user.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub payment_id: PaymentId,
    pub user_id: UserId,
}

/// Result of a confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPaymentResult {
    /// The gateway does not know this payment.
    NotFound,
    /// Already granted earlier; nothing changed.
    AlreadyApplied { subscription_end: Option<Timestamp> },
    /// Not paid (yet); the status was recorded.
    NotSucceeded(PaymentStatus),
    /// A new period was granted.
    Applied {
        new_end: Timestamp,
        invite: Option<InviteLink>,
    },
}

/// Handler for payment confirmation.
pub struct ConfirmPaymentHandler {
    store: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
    channel: Arc<dyn ChannelManager>,
    notifier: Arc<dyn Notifier>,
    alerts: Arc<OperationalAlerts>,
    messages: Arc<MessageCatalog>,
    clock: SharedClock,
    terms: SubscriptionTerms,
}

impl ConfirmPaymentHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
        channel: Arc<dyn ChannelManager>,
        notifier: Arc<dyn Notifier>,
        alerts: Arc<OperationalAlerts>,
        messages: Arc<MessageCatalog>,
        clock: SharedClock,
        terms: SubscriptionTerms,
    ) -> Self {
        Self {
            store,
            gateway,
            channel,
            notifier,
            alerts,
            messages,
            clock,
            terms,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmPaymentCommand,
    ) -> Result<ConfirmPaymentResult, SubscriptionError> {
        let Some(remote) = self.gateway.fetch_payment(&cmd.payment_id).await? else {
            tracing::info!(payment_id = %cmd.payment_id, user_id = %cmd.user_id, "Payment unknown to gateway");
            return Ok(ConfirmPaymentResult::NotFound);
        };

        if remote.owner != Some(cmd.user_id) {
            return Err(self.mismatch(&cmd));
        }

        if let Some(stored) = self.store.read_payment(&cmd.payment_id).await? {
            if !stored.is_owned_by(cmd.user_id) {
                return Err(self.mismatch(&cmd));
            }
            if stored.status.is_succeeded() {
                return Ok(ConfirmPaymentResult::AlreadyApplied {
                    subscription_end: self.current_end(cmd.user_id).await?,
                });
            }
        }

        let now = now_from(&self.clock);

        if !remote.status.is_succeeded() {
            self.store
                .update_payment_status(&cmd.payment_id, remote.status, now)
                .await?;
            tracing::info!(
                payment_id = %cmd.payment_id,
                status = %remote.status,
                "Payment not succeeded yet"
            );
            return Ok(ConfirmPaymentResult::NotSucceeded(remote.status));
        }

        let outcome = self
            .store
            .apply_subscription_extension(ExtensionRequest {
                user_id: cmd.user_id,
                payment_id: cmd.payment_id.clone(),
                amount: remote.amount.clone(),
                now,
                terms: self.terms,
            })
            .await?;

        match outcome {
            ExtensionOutcome::Applied { new_end } => {
                tracing::info!(
                    payment_id = %cmd.payment_id,
                    user_id = %cmd.user_id,
                    new_end = %new_end,
                    "Subscription extended"
                );
                let invite = self.after_commit(&cmd, &remote, new_end).await;
                Ok(ConfirmPaymentResult::Applied { new_end, invite })
            }
            ExtensionOutcome::AlreadyApplied { subscription_end } => {
                Ok(ConfirmPaymentResult::AlreadyApplied { subscription_end })
            }
            ExtensionOutcome::OwnershipMismatch => Err(self.mismatch(&cmd)),
            ExtensionOutcome::UserNotFound => Err(SubscriptionError::UserNotFound(cmd.user_id)),
            ExtensionOutcome::StatusConflict { status } => {
                tracing::warn!(
                    payment_id = %cmd.payment_id,
                    user_id = %cmd.user_id,
                    stored_status = %status,
                    "Gateway reports success for a payment stored as final"
                );
                let detail = format!(
                    "payment {} is stored as {} but the gateway reports it succeeded",
                    cmd.payment_id, status
                );
                self.alerts
                    .alert(self.messages.alert_failure(
                        "payment confirmation",
                        Some(cmd.user_id),
                        &detail,
                    ))
                    .await;
                Ok(ConfirmPaymentResult::NotSucceeded(status))
            }
        }
    }

    fn mismatch(&self, cmd: &ConfirmPaymentCommand) -> SubscriptionError {
        tracing::warn!(
            payment_id = %cmd.payment_id,
            user_id = %cmd.user_id,
            "Payment does not belong to requesting user"
        );
        SubscriptionError::ownership_mismatch(cmd.payment_id.clone(), cmd.user_id)
    }

    async fn current_end(&self, user_id: UserId) -> Result<Option<Timestamp>, SubscriptionError> {
        Ok(self
            .store
            .read_user(user_id)
            .await?
            .and_then(|u| u.subscription_end))
    }

    /// Invite, user notification and operator alert. None of these can undo
    /// the committed extension, so failures are only logged.
    async fn after_commit(
        &self,
        cmd: &ConfirmPaymentCommand,
        remote: &GatewayPayment,
        new_end: Timestamp,
    ) -> Option<InviteLink> {
        let invite = match self.channel.create_single_use_invite(cmd.user_id).await {
            Ok(invite) => Some(invite),
            Err(e) => {
                tracing::error!(user_id = %cmd.user_id, error = %e, "Invite after payment failed");
                self.alerts
                    .alert(self.messages.alert_failure(
                        "invite after payment",
                        Some(cmd.user_id),
                        &e.to_string(),
                    ))
                    .await;
                None
            }
        };

        let message = self.messages.payment_confirmed(new_end, invite.as_ref());
        if let Err(e) = self.notifier.send(cmd.user_id, message).await {
            tracing::warn!(user_id = %cmd.user_id, error = %e, "Payment confirmation not delivered");
        }

        let name = match self.store.read_user(cmd.user_id).await {
            Ok(user) => user.and_then(|u| u.display_name),
            Err(_) => None,
        };
        self.alerts
            .alert(self.messages.alert_new_payment(
                cmd.user_id,
                name.as_deref(),
                &remote.amount,
                &cmd.payment_id,
            ))
            .await;

        invite
    }
}
