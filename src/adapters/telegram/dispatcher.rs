//! BotDispatcher - Long-polls the Bot API and routes updates to handlers.
//!
//! Updates are translated into [`BotEvent`]s and each event is handled on
//! its own task, so one slow user never blocks another. Replies go out
//! through the [`Notifier`] port; failures get a generic apology and an
//! operator alert.
//!
//! ## Graceful Shutdown
//!
//! The poll loop stops when the shutdown signal flips. Tasks already
//! spawned run to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::client::{BotApiError, TelegramClient};
use super::types::{CallbackQuery, ChatMemberUpdated, Message, Update};
use crate::application::messages::callbacks;
use crate::application::{
    CheckAccessHandler, CheckAccessQuery, CheckAccessResult, CheckPaymentHandler,
    CheckPaymentQuery, CheckPaymentResult, ListActiveUsersHandler, ListActiveUsersQuery,
    MembershipChangeCommand, MembershipChangeHandler, MessageCatalog, OperationalAlerts,
    RegisterUserCommand, RegisterUserHandler, RejoinHandler, RejoinQuery, RejoinResult,
};
use crate::domain::foundation::{ChannelId, UserId};
use crate::domain::subscription::SubscriptionError;
use crate::ports::{Notifier, OutboundMessage};

const START_PAYMENT_PREFIX: &str = "payment_";
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// What a user asked for, by command or button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotAction {
    /// `/start`, optionally with a deep-link payload.
    Start { payload: Option<String> },
    Check,
    Rejoin,
    CheckPayment,
    Help,
    Admin,
    ListActiveUsers,
    Unknown,
}

impl BotAction {
    /// Parses a `/command [args]` message. `None` for plain text and
    /// commands the bot does not know.
    pub fn from_command(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head);

        let action = match name {
            "start" => BotAction::Start {
                payload: parts.next().map(str::to_string),
            },
            "check" => BotAction::Check,
            "rejoin" => BotAction::Rejoin,
            "check_payment" => BotAction::CheckPayment,
            "help" => BotAction::Help,
            "admin" => BotAction::Admin,
            "remove_inactive" => BotAction::ListActiveUsers,
            _ => return None,
        };
        Some(action)
    }

    pub fn from_callback(data: &str) -> Self {
        match data {
            callbacks::CHECK => BotAction::Check,
            callbacks::REJOIN => BotAction::Rejoin,
            callbacks::CHECK_PAYMENT => BotAction::CheckPayment,
            callbacks::HELP => BotAction::Help,
            callbacks::REMOVE_INACTIVE => BotAction::ListActiveUsers,
            _ => BotAction::Unknown,
        }
    }

    fn context(&self) -> &'static str {
        match self {
            BotAction::Start { .. } => "/start",
            BotAction::Check => "/check",
            BotAction::Rejoin => "/rejoin",
            BotAction::CheckPayment => "/check_payment",
            BotAction::Help => "/help",
            BotAction::Admin => "/admin",
            BotAction::ListActiveUsers => "active user list",
            BotAction::Unknown => "button handling",
        }
    }
}

/// An update the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    Action {
        user_id: UserId,
        display_name: Option<String>,
        action: BotAction,
        /// Set for button presses, which must be acknowledged.
        callback_query_id: Option<String>,
    },
    MembershipChange(MembershipChangeCommand),
}

impl BotEvent {
    /// `None` for updates the bot ignores: group chatter, bots, plain text.
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(message) = update.message {
            return Self::from_message(message);
        }
        if let Some(query) = update.callback_query {
            return Self::from_callback(query);
        }
        update.chat_member.map(Self::from_member_update)
    }

    fn from_message(message: Message) -> Option<Self> {
        if !message.chat.is_private() {
            return None;
        }
        let from = message.from.filter(|u| !u.is_bot)?;
        let action = BotAction::from_command(message.text.as_deref()?)?;
        Some(BotEvent::Action {
            user_id: UserId::new(from.id),
            display_name: from.display_name(),
            action,
            callback_query_id: None,
        })
    }

    fn from_callback(query: CallbackQuery) -> Option<Self> {
        let action = BotAction::from_callback(query.data.as_deref().unwrap_or_default());
        Some(BotEvent::Action {
            user_id: UserId::new(query.from.id),
            display_name: query.from.display_name(),
            action,
            callback_query_id: Some(query.id),
        })
    }

    fn from_member_update(change: ChatMemberUpdated) -> Self {
        BotEvent::MembershipChange(MembershipChangeCommand {
            user_id: UserId::new(change.new_chat_member.user.id),
            chat_id: ChannelId::new(change.chat.id),
            old_status: change.old_chat_member.status,
            new_status: change.new_chat_member.status,
        })
    }
}

/// Handlers the bot routes to.
pub struct BotServices {
    pub register: Arc<RegisterUserHandler>,
    pub access: Arc<CheckAccessHandler>,
    pub rejoin: Arc<RejoinHandler>,
    pub check_payment: Arc<CheckPaymentHandler>,
    pub membership: Arc<MembershipChangeHandler>,
    pub list_active: Arc<ListActiveUsersHandler>,
    pub alerts: Arc<OperationalAlerts>,
    pub messages: Arc<MessageCatalog>,
}

/// Turns events into handler calls and replies.
pub struct BotRouter {
    services: BotServices,
    notifier: Arc<dyn Notifier>,
}

impl BotRouter {
    pub fn new(services: BotServices, notifier: Arc<dyn Notifier>) -> Self {
        Self { services, notifier }
    }

    pub async fn route(&self, event: BotEvent) {
        match event {
            BotEvent::Action {
                user_id,
                display_name,
                action,
                ..
            } => {
                let context = action.context();
                match self.perform(user_id, display_name, action).await {
                    Ok(Some(reply)) => self.reply(user_id, reply).await,
                    Ok(None) => {}
                    Err(SubscriptionError::Forbidden(reason)) => {
                        tracing::warn!(user_id = %user_id, reason = %reason, "Forbidden request");
                        self.reply(user_id, self.services.messages.forbidden()).await;
                    }
                    Err(e) => self.report_failure(context, user_id, &e).await,
                }
            }
            BotEvent::MembershipChange(cmd) => {
                let user_id = cmd.user_id;
                if let Err(e) = self.services.membership.handle(cmd).await {
                    tracing::error!(user_id = %user_id, error = %e, "Membership change failed");
                    let text = self.services.messages.alert_failure(
                        "membership change",
                        Some(user_id),
                        &e.to_string(),
                    );
                    self.services.alerts.alert(text).await;
                }
            }
        }
    }

    async fn perform(
        &self,
        user_id: UserId,
        display_name: Option<String>,
        action: BotAction,
    ) -> Result<Option<OutboundMessage>, SubscriptionError> {
        let messages = &self.services.messages;

        match action {
            BotAction::Start { payload } => match start_payment_owner(payload.as_deref()) {
                Some(owner) if owner != user_id => {
                    tracing::warn!(user_id = %user_id, owner = %owner, "Foreign payment link");
                    Ok(Some(messages.payment_link_foreign()))
                }
                Some(_) => self.check_payment(user_id).await,
                None => {
                    let result = self
                        .services
                        .register
                        .handle(RegisterUserCommand {
                            user_id,
                            display_name,
                        })
                        .await?;
                    Ok(Some(messages.welcome(
                        &result.state,
                        result.invite.as_ref(),
                        &result.purchase_url,
                    )))
                }
            },
            BotAction::Check => {
                let result = self.services.access.handle(CheckAccessQuery { user_id }).await?;
                Ok(Some(self.render_access(result, false)))
            }
            BotAction::Rejoin => {
                match self.services.rejoin.handle(RejoinQuery { user_id }).await? {
                    RejoinResult::AlreadyMember => Ok(Some(messages.already_member())),
                    RejoinResult::Access(result) => Ok(Some(self.render_access(result, true))),
                }
            }
            BotAction::CheckPayment => self.check_payment(user_id).await,
            BotAction::Help => Ok(Some(
                messages.help(self.services.alerts.is_operator(user_id)),
            )),
            BotAction::Admin => {
                if !self.services.alerts.is_operator(user_id) {
                    return Err(SubscriptionError::forbidden("operators only"));
                }
                Ok(Some(messages.admin_menu()))
            }
            BotAction::ListActiveUsers => {
                let result = self
                    .services
                    .list_active
                    .handle(ListActiveUsersQuery {
                        requested_by: user_id,
                    })
                    .await?;
                Ok(Some(messages.active_users(&result.users)))
            }
            BotAction::Unknown => Ok(Some(messages.unknown_action())),
        }
    }

    async fn check_payment(
        &self,
        user_id: UserId,
    ) -> Result<Option<OutboundMessage>, SubscriptionError> {
        let messages = &self.services.messages;
        let result = self
            .services
            .check_payment
            .handle(CheckPaymentQuery { user_id })
            .await?;

        Ok(match result {
            CheckPaymentResult::NoPayments => Some(messages.no_payments()),
            // The confirmation already carried the invite.
            CheckPaymentResult::Confirmed { .. } => None,
            CheckPaymentResult::Succeeded { .. } => Some(messages.payment_succeeded()),
            CheckPaymentResult::Pending { .. } => Some(messages.payment_pending()),
            CheckPaymentResult::Failed { status, .. } => Some(messages.payment_failed(status)),
        })
    }

    fn render_access(&self, result: CheckAccessResult, rejoining: bool) -> OutboundMessage {
        match result {
            CheckAccessResult::Entitled {
                state,
                invite,
                renewal_url,
            } => self
                .services
                .messages
                .access_granted(&state, &invite, renewal_url.as_deref()),
            CheckAccessResult::NotEntitled { purchase_url } => self
                .services
                .messages
                .access_expired(&purchase_url, rejoining),
        }
    }

    async fn reply(&self, user_id: UserId, message: OutboundMessage) {
        if let Err(e) = self.notifier.send(user_id, message).await {
            tracing::warn!(user_id = %user_id, error = %e, "Reply failed");
        }
    }

    async fn report_failure(&self, context: &str, user_id: UserId, err: &SubscriptionError) {
        tracing::error!(
            user_id = %user_id,
            context = context,
            code = err.code(),
            error = %err,
            "Bot action failed"
        );
        self.reply(user_id, self.services.messages.generic_error()).await;
        let text = self
            .services
            .messages
            .alert_failure(context, Some(user_id), &err.to_string());
        self.services.alerts.alert(text).await;
    }
}

/// Owner encoded in a `payment_<user id>` deep link.
fn start_payment_owner(payload: Option<&str>) -> Option<UserId> {
    payload?
        .strip_prefix(START_PAYMENT_PREFIX)?
        .parse()
        .ok()
}

/// Long-poll loop feeding the router.
pub struct BotDispatcher {
    client: Arc<TelegramClient>,
    router: Arc<BotRouter>,
    poll_timeout: Duration,
}

impl BotDispatcher {
    pub fn new(client: Arc<TelegramClient>, router: Arc<BotRouter>, poll_timeout: Duration) -> Self {
        Self {
            client,
            router,
            poll_timeout,
        }
    }

    /// Poll until shutdown is signalled.
    ///
    /// Returns an error only when another process holds the same token;
    /// other failures are retried after a short delay.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), BotApiError> {
        let mut offset: Option<i64> = None;
        tracing::info!("Bot dispatcher started");

        loop {
            let polled = tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Bot dispatcher stopping");
                        return Ok(());
                    }
                    continue;
                }
                polled = self.client.get_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update);
                    }
                }
                Err(e) if e.is_conflict() => {
                    tracing::error!(error = %e, "Another bot instance is polling");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Polling failed, retrying");
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }
    }

    fn dispatch(&self, update: Update) {
        let update_id = update.update_id;
        let Some(event) = BotEvent::from_update(update) else {
            tracing::debug!(update_id, "Update ignored");
            return;
        };

        let client = self.client.clone();
        let router = self.router.clone();
        tokio::spawn(async move {
            if let BotEvent::Action {
                callback_query_id: Some(query_id),
                ..
            } = &event
            {
                if let Err(e) = client.answer_callback_query(query_id).await {
                    tracing::debug!(error = %e, "Callback acknowledgement failed");
                }
            }
            router.route(event).await;
        });
    }
}
