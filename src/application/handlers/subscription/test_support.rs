//! Shared wiring for handler tests: in-memory store, recording doubles and a
//! clock pinned to 2025-01-01T00:00:00Z.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::adapters::memory::InMemorySubscriptionStore;
use crate::adapters::testing::{MockPaymentGateway, MutableClock, RecordingChannel, RecordingNotifier};
use crate::application::{MessageCatalog, OperationalAlerts, SharedClock};
use crate::domain::foundation::{ChannelId, Timestamp, UserId};
use crate::domain::subscription::{Money, SubscriptionTerms};

use super::*;

pub const OPERATOR: UserId = UserId::new(900);
pub const CHANNEL: ChannelId = ChannelId::new(-100_123);

pub struct Fixture {
    pub store: Arc<InMemorySubscriptionStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub channel: Arc<RecordingChannel>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<MutableClock>,
    pub terms: SubscriptionTerms,
    pub messages: Arc<MessageCatalog>,
    pub alerts: Arc<OperationalAlerts>,
}

impl Fixture {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let messages = Arc::new(MessageCatalog::new(
            Money::new(100_000, "RUB").unwrap(),
            "https://t.me/club_chat",
            "https://t.me/club_channel",
        ));
        Self {
            store: Arc::new(InMemorySubscriptionStore::new()),
            gateway: Arc::new(MockPaymentGateway::new()),
            channel: Arc::new(RecordingChannel::new()),
            alerts: Arc::new(OperationalAlerts::new(notifier.clone(), vec![OPERATOR])),
            notifier,
            clock: Arc::new(MutableClock::new(start)),
            terms: SubscriptionTerms::new(5, 30),
            messages,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_datetime(mockable::Clock::utc(&*self.clock))
    }

    pub fn price(&self) -> Money {
        Money::new(100_000, "RUB").unwrap()
    }

    pub fn shared_clock(&self) -> SharedClock {
        self.clock.clone()
    }

    pub fn purchases(&self) -> Arc<StartPurchaseHandler> {
        Arc::new(StartPurchaseHandler::new(
            self.store.clone(),
            self.gateway.clone(),
            self.shared_clock(),
            PurchaseSettings {
                price: self.price(),
                description: "Channel access, 30 days".into(),
                bot_username: "pass_bot".into(),
            },
        ))
    }

    pub fn register_handler(&self) -> RegisterUserHandler {
        RegisterUserHandler::new(
            self.store.clone(),
            self.channel.clone(),
            self.purchases(),
            self.shared_clock(),
            self.terms,
        )
    }

    pub fn access(&self) -> Arc<CheckAccessHandler> {
        Arc::new(CheckAccessHandler::new(
            self.store.clone(),
            self.channel.clone(),
            self.purchases(),
            self.shared_clock(),
            self.terms,
        ))
    }

    pub fn rejoin(&self) -> RejoinHandler {
        RejoinHandler::new(self.access(), self.channel.clone())
    }

    pub fn confirm(&self) -> Arc<ConfirmPaymentHandler> {
        Arc::new(ConfirmPaymentHandler::new(
            self.store.clone(),
            self.gateway.clone(),
            self.channel.clone(),
            self.notifier.clone(),
            self.alerts.clone(),
            self.messages.clone(),
            self.shared_clock(),
            self.terms,
        ))
    }

    pub fn check_payment(&self) -> CheckPaymentHandler {
        CheckPaymentHandler::new(self.store.clone(), self.confirm())
    }

    pub fn membership(&self) -> MembershipChangeHandler {
        MembershipChangeHandler::new(
            self.store.clone(),
            self.channel.clone(),
            self.notifier.clone(),
            self.alerts.clone(),
            self.messages.clone(),
            self.shared_clock(),
            self.terms,
            CHANNEL,
        )
    }

    pub fn list_active(&self) -> ListActiveUsersHandler {
        ListActiveUsersHandler::new(self.store.clone(), self.alerts.clone())
    }
}
