//! ExpirySweeper - Background service for reminders and lapse enforcement.
//!
//! Each pass walks every active user:
//!
//! 1. Entitled with `days_left` on a reminder threshold → one reminder
//! 2. Period ended before now → deactivate (rechecked in the store), remove
//!    from the channel, tell the user, alert operators. This includes a
//!    trial in its last partial day once `trial_end` has passed.
//!
//! A user deactivated in one pass is not listed in the next, so nobody is
//! removed or notified twice.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 24h | Time between passes |
//! | `reminder_days` | `[3, 1]` | Days-left values that trigger a reminder |
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal and finishes the pass in
//! progress before stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::handlers::subscription::StartPurchaseHandler;
use crate::application::{now_from, MessageCatalog, OperationalAlerts, SharedClock};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{
    compute_state, is_lapsed, SubscriptionError, SubscriptionTerms, User,
};
use crate::ports::{ChannelManager, Delivery, Notifier, RevokeOutcome, SubscriptionStore};

/// Configuration for the ExpirySweeper service.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    pub reminder_days: Vec<u32>,
    pub terms: SubscriptionTerms,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            reminder_days: vec![3, 1],
            terms: SubscriptionTerms::default(),
        }
    }
}

impl SweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_reminder_days(mut self, days: Vec<u32>) -> Self {
        self.reminder_days = days;
        self
    }

    pub fn with_terms(mut self, terms: SubscriptionTerms) -> Self {
        self.terms = terms;
        self
    }
}

/// Counts from one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub reminded: usize,
    pub expired: usize,
    pub failed: usize,
}

/// What happened to one user during a pass.
enum UserOutcome {
    Untouched,
    Reminded,
    Expired,
}

pub struct ExpirySweeper {
    store: Arc<dyn SubscriptionStore>,
    channel: Arc<dyn ChannelManager>,
    notifier: Arc<dyn Notifier>,
    purchases: Arc<StartPurchaseHandler>,
    alerts: Arc<OperationalAlerts>,
    messages: Arc<MessageCatalog>,
    clock: SharedClock,
    config: SweeperConfig,
}

impl ExpirySweeper {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        channel: Arc<dyn ChannelManager>,
        notifier: Arc<dyn Notifier>,
        purchases: Arc<StartPurchaseHandler>,
        alerts: Arc<OperationalAlerts>,
        messages: Arc<MessageCatalog>,
        clock: SharedClock,
        config: SweeperConfig,
    ) -> Self {
        Self {
            store,
            channel,
            notifier,
            purchases,
            alerts,
            messages,
            clock,
            config,
        }
    }

    /// Run passes on the configured interval until shutdown is signalled.
    ///
    /// The first pass runs immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Expiry sweeper stopping");
                        return;
                    }
                }

                _ = interval.tick() => {
                    let now = now_from(&self.clock);
                    match self.sweep_once(now).await {
                        Ok(report) => tracing::info!(
                            examined = report.examined,
                            reminded = report.reminded,
                            expired = report.expired,
                            failed = report.failed,
                            "Sweep finished"
                        ),
                        Err(e) => {
                            tracing::error!(error = %e, "Sweep failed");
                            self.alerts
                                .alert(self.messages.alert_failure("expiry sweep", None, &e.to_string()))
                                .await;
                        }
                    }
                }
            }
        }
    }

    /// Run exactly one pass at `now`.
    ///
    /// Only listing the users can fail the pass; per-user failures are
    /// counted in the report.
    pub async fn sweep_once(&self, now: Timestamp) -> Result<SweepReport, SubscriptionError> {
        let users = self.store.list_active_users().await?;
        let mut report = SweepReport {
            examined: users.len(),
            ..SweepReport::default()
        };

        for user in users {
            match self.sweep_user(&user, now).await {
                Ok(UserOutcome::Untouched) => {}
                Ok(UserOutcome::Reminded) => report.reminded += 1,
                Ok(UserOutcome::Expired) => report.expired += 1,
                Err(e) => {
                    tracing::error!(user_id = %user.user_id, error = %e, "Sweep failed for user");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn sweep_user(&self, user: &User, now: Timestamp) -> Result<UserOutcome, SubscriptionError> {
        let trial_days = self.config.terms.trial_days;
        let state = compute_state(user, now, trial_days);

        if !is_lapsed(user, now, trial_days) {
            if !self.config.reminder_days.contains(&state.days_left) {
                return Ok(UserOutcome::Untouched);
            }
            let link = self.purchases.purchase_link(user.user_id).await;
            let message = self.messages.renewal_reminder(state.days_left, link.as_deref());
            return match self.notifier.send(user.user_id, message).await? {
                Delivery::Delivered => {
                    tracing::info!(user_id = %user.user_id, days_left = state.days_left, "Renewal reminder sent");
                    Ok(UserOutcome::Reminded)
                }
                Delivery::Unreachable => {
                    tracing::info!(user_id = %user.user_id, "Skipping reminder, user unreachable");
                    Ok(UserOutcome::Untouched)
                }
            };
        }

        if !self
            .store
            .deactivate_if_lapsed(user.user_id, now, self.config.terms)
            .await?
        {
            // Renewed between listing and locking.
            return Ok(UserOutcome::Untouched);
        }
        tracing::info!(user_id = %user.user_id, "Subscription lapsed, user deactivated");

        self.remove_from_channel(user).await;

        let link = self.purchases.purchase_link(user.user_id).await;
        match self
            .notifier
            .send(user.user_id, self.messages.subscription_expired(link.as_deref()))
            .await
        {
            Ok(Delivery::Delivered) => {}
            Ok(Delivery::Unreachable) => {
                tracing::info!(user_id = %user.user_id, "Skipping expiry notice, user unreachable");
            }
            Err(e) => {
                tracing::error!(user_id = %user.user_id, error = %e, "Expiry notice failed");
                self.alerts
                    .alert(self.messages.alert_failure(
                        "expiry notice",
                        Some(user.user_id),
                        &e.to_string(),
                    ))
                    .await;
            }
        }

        Ok(UserOutcome::Expired)
    }

    async fn remove_from_channel(&self, user: &User) {
        match self.channel.revoke_membership(user.user_id).await {
            Ok(RevokeOutcome::Revoked) => {
                tracing::info!(user_id = %user.user_id, "Removed from channel");
                self.alerts
                    .alert(
                        self.messages
                            .alert_removed(user.user_id, user.display_name.as_deref()),
                    )
                    .await;
            }
            Ok(RevokeOutcome::NotAMember) => {
                tracing::info!(user_id = %user.user_id, "Not in channel, nothing to remove");
            }
            Err(e) => {
                tracing::error!(user_id = %user.user_id, error = %e, "Channel removal failed");
                self.alerts
                    .alert(self.messages.alert_failure(
                        "channel removal",
                        Some(user.user_id),
                        &e.to_string(),
                    ))
                    .await;
            }
        }
    }
}
