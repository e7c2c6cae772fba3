//! CheckAccessHandler - Query handler for a user's access to the channel.

use std::sync::Arc;

use crate::application::{now_from, SharedClock};
use crate::domain::foundation::UserId;
use crate::domain::subscription::{compute_state, EntitlementState, SubscriptionError, SubscriptionTerms};
use crate::ports::{ChannelManager, InviteLink, SubscriptionStore};

use super::{StartPurchaseCommand, StartPurchaseHandler};

/// Query for access status.
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub user_id: UserId,
}

/// Access status with whatever link the user needs next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckAccessResult {
    /// Entitled; a fresh invite was issued.
    Entitled {
        state: EntitlementState,
        invite: InviteLink,
        /// Absent when the gateway could not create a payment.
        renewal_url: Option<String>,
    },
    /// Not entitled; must purchase.
    NotEntitled { purchase_url: String },
}

/// Handler for access checks.
pub struct CheckAccessHandler {
    store: Arc<dyn SubscriptionStore>,
    channel: Arc<dyn ChannelManager>,
    purchases: Arc<StartPurchaseHandler>,
    clock: SharedClock,
    terms: SubscriptionTerms,
}

impl CheckAccessHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        channel: Arc<dyn ChannelManager>,
        purchases: Arc<StartPurchaseHandler>,
        clock: SharedClock,
        terms: SubscriptionTerms,
    ) -> Self {
        Self {
            store,
            channel,
            purchases,
            clock,
            terms,
        }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<CheckAccessResult, SubscriptionError> {
        let state = self.entitlement(query.user_id).await?;
        self.grant(query.user_id, state).await
    }

    /// Current entitlement. Unknown users have none.
    pub async fn entitlement(&self, user_id: UserId) -> Result<EntitlementState, SubscriptionError> {
        let now = now_from(&self.clock);
        Ok(match self.store.read_user(user_id).await? {
            Some(user) => compute_state(&user, now, self.terms.trial_days),
            None => EntitlementState::none(),
        })
    }

    /// Issues the invite or purchase link that `state` calls for.
    pub async fn grant(
        &self,
        user_id: UserId,
        state: EntitlementState,
    ) -> Result<CheckAccessResult, SubscriptionError> {
        if state.grants_access() {
            let invite = self.channel.create_single_use_invite(user_id).await?;
            let renewal_url = self.purchases.purchase_link(user_id).await;
            return Ok(CheckAccessResult::Entitled {
                state,
                invite,
                renewal_url,
            });
        }

        let purchase = self
            .purchases
            .handle(StartPurchaseCommand {
                user_id,
                display_name: None,
            })
            .await?;
        Ok(CheckAccessResult::NotEntitled {
            purchase_url: purchase.confirmation_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::subscription::test_support::Fixture;
    use crate::domain::subscription::{EntitlementKind, User};
    use crate::ports::PaymentError;

    fn query(id: i64) -> CheckAccessQuery {
        CheckAccessQuery {
            user_id: UserId::new(id),
        }
    }

    #[tokio::test]
    async fn paid_user_gets_invite_and_renewal_link() {
        let fx = Fixture::new();
        let mut user = User::register(UserId::new(1), None, fx.now().minus_days(20));
        user.apply_extension(fx.now().plus_days(10));
        fx.store.put_user(user).await;

        let result = fx.access().handle(query(1)).await.unwrap();

        match result {
            CheckAccessResult::Entitled { state, renewal_url, .. } => {
                assert_eq!(state.kind, EntitlementKind::Paid);
                assert_eq!(state.days_left, 10);
                assert!(renewal_url.is_some());
            }
            other => panic!("expected Entitled, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn renewal_link_is_optional() {
        let fx = Fixture::new();
        fx.store
            .put_user(User::register(UserId::new(1), None, fx.now()))
            .await;
        fx.gateway
            .set_method_error("create_payment", PaymentError::network("down"));

        let result = fx.access().handle(query(1)).await.unwrap();

        assert!(matches!(
            result,
            CheckAccessResult::Entitled { renewal_url: None, .. }
        ));
    }

    #[tokio::test]
    async fn expired_user_must_purchase() {
        let fx = Fixture::new();
        let mut user = User::register(UserId::new(1), None, fx.now().minus_days(60));
        user.apply_extension(fx.now().minus_days(1));
        fx.store.put_user(user).await;

        let result = fx.access().handle(query(1)).await.unwrap();

        assert!(matches!(result, CheckAccessResult::NotEntitled { .. }));
        assert!(fx.channel.invites().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_has_no_entitlement() {
        let fx = Fixture::new();
        let state = fx.access().entitlement(UserId::new(77)).await.unwrap();
        assert_eq!(state, EntitlementState::none());
    }

    #[tokio::test]
    async fn purchase_failure_for_unentitled_user_is_an_error() {
        let fx = Fixture::new();
        fx.gateway
            .set_method_error("create_payment", PaymentError::network("down"));

        assert!(fx.access().handle(query(77)).await.is_err());
    }
}
