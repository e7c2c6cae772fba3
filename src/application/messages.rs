//! User-facing and operator-facing message texts.
//!
//! Messages are HTML (`<b>` only); anything user-supplied goes through
//! [`escape_html`] first.

use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::domain::subscription::{EntitlementKind, EntitlementState, Money, PaymentStatus, User};
use crate::ports::{Button, InviteLink, OutboundMessage};

/// Callback data carried by inline buttons.
pub mod callbacks {
    pub const CHECK: &str = "check";
    pub const REJOIN: &str = "rejoin";
    pub const CHECK_PAYMENT: &str = "check_payment";
    pub const HELP: &str = "help";
    pub const REMOVE_INACTIVE: &str = "remove_inactive";
}

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Renders every message the service sends.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    price: Money,
    community_chat_link: String,
    channel_public_link: String,
}

impl MessageCatalog {
    pub fn new(
        price: Money,
        community_chat_link: impl Into<String>,
        channel_public_link: impl Into<String>,
    ) -> Self {
        Self {
            price,
            community_chat_link: community_chat_link.into(),
            channel_public_link: channel_public_link.into(),
        }
    }

    fn price_line(&self) -> String {
        format!("{} / month", self.price)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Access
    // ════════════════════════════════════════════════════════════════════════════

    /// Reply to `/start`: greeting, current standing and the full keyboard.
    pub fn welcome(
        &self,
        state: &EntitlementState,
        invite: Option<&InviteLink>,
        purchase_url: &str,
    ) -> OutboundMessage {
        let mut text = String::from(
            "✨ <b>Welcome to the club</b> ✨\n\n\
             Practices, recipes and a community that supports you.\n\n",
        );

        match (state.kind, invite) {
            (EntitlementKind::Paid, Some(invite)) => {
                text.push_str(&format!(
                    "⭐️ <b>Your subscription is active</b>\n\
                     Type: paid\n\
                     Days left: {}\n\
                     Ends: {}\n\n\
                     🔗 Channel link: {}\n\
                     💬 Community chat: {}\n\n\
                     💳 Extend your subscription: {}",
                    state.days_left,
                    format_date(state.period_end),
                    invite.url,
                    self.community_chat_link,
                    self.price_line()
                ));
            }
            (EntitlementKind::Trial, Some(invite)) => {
                text.push_str(&format!(
                    "✨ <b>You have {} days of free access</b>\n\n\
                     🔗 Channel link: {}\n\
                     💬 Community chat: {}\n\n\
                     💳 After the trial: {}",
                    state.days_left,
                    invite.url,
                    self.community_chat_link,
                    self.price_line()
                ));
            }
            _ => {
                text.push_str(&format!(
                    "🔒 A subscription is required to access the channel.\n\n💳 Price: {}",
                    self.price_line()
                ));
            }
        }

        let channel_url = invite
            .map(|i| i.url.clone())
            .unwrap_or_else(|| self.channel_public_link.clone());

        OutboundMessage::text(text)
            .with_button(Button::url("🔐 Go to the channel", channel_url))
            .with_button(Button::url("💬 Community chat", &self.community_chat_link))
            .with_button(Button::url("💳 Pay or extend", purchase_url))
            .with_button(Button::callback("🔍 Check subscription", callbacks::CHECK))
            .with_button(Button::callback("🔄 Back to the channel", callbacks::REJOIN))
            .with_button(Button::callback("💸 Payment status", callbacks::CHECK_PAYMENT))
            .with_button(Button::callback("❓ Help", callbacks::HELP))
    }

    /// Active subscription with a fresh invite.
    pub fn access_granted(
        &self,
        state: &EntitlementState,
        invite: &InviteLink,
        renewal_url: Option<&str>,
    ) -> OutboundMessage {
        let text = format!(
            "✅ <b>Your subscription is active</b>\n\n\
             Type: {}\n\
             Days left: {}\n\
             Ends: {}\n\n\
             🔗 New channel link: {}",
            kind_label(state.kind),
            state.days_left,
            format_date(state.period_end),
            invite.url
        );

        let mut message =
            OutboundMessage::text(text).with_button(Button::url("🔐 Go to the channel", &invite.url));
        if let Some(url) = renewal_url {
            message = message.with_button(Button::url("💳 Extend subscription", url));
        }
        message.with_button(Button::callback("❓ Help", callbacks::HELP))
    }

    /// No entitlement; offers a purchase.
    pub fn access_expired(&self, purchase_url: &str, rejoining: bool) -> OutboundMessage {
        let reason = if rejoining {
            "To return to the channel, please extend your subscription."
        } else {
            "To keep your access, please extend your subscription."
        };
        OutboundMessage::text(format!(
            "❌ <b>Your subscription has expired</b>\n\n{}\n💳 Price: {}",
            reason,
            self.price_line()
        ))
        .with_button(Button::url("💳 Extend subscription", purchase_url))
        .with_button(Button::callback("❓ Help", callbacks::HELP))
    }

    pub fn already_member(&self) -> OutboundMessage {
        OutboundMessage::text("✅ You are already in the channel. No new link is needed.")
    }

    pub fn invite_failed(&self) -> OutboundMessage {
        OutboundMessage::text(
            "⚠️ Could not create a channel link. Please try again later or contact support.",
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payments
    // ════════════════════════════════════════════════════════════════════════════

    pub fn payment_confirmed(
        &self,
        new_end: Timestamp,
        invite: Option<&InviteLink>,
    ) -> OutboundMessage {
        match invite {
            Some(invite) => OutboundMessage::text(format!(
                "✅ <b>Payment confirmed!</b>\n\n\
                 🔓 Your subscription is extended until {}\n\
                 🔗 Channel link: {}\n\n\
                 Thank you! ❤️",
                new_end.as_datetime().format(DATE_FORMAT),
                invite.url
            ))
            .with_button(Button::url("🔐 Go to the channel", &invite.url)),
            None => OutboundMessage::text(format!(
                "✅ <b>Payment confirmed!</b>\n\n\
                 🔓 Your subscription is extended until {}\n\n\
                 ⚠️ Could not create a channel link. Use /rejoin or contact support.",
                new_end.as_datetime().format(DATE_FORMAT)
            )),
        }
    }

    pub fn payment_succeeded(&self) -> OutboundMessage {
        OutboundMessage::text(
            "✅ Your latest payment has been processed. Use /check to get a new channel link.",
        )
    }

    pub fn payment_pending(&self) -> OutboundMessage {
        OutboundMessage::text(
            "⌛️ Your latest payment is not processed yet. Try again in a minute or use /check_payment.",
        )
    }

    pub fn payment_failed(&self, status: PaymentStatus) -> OutboundMessage {
        OutboundMessage::text(format!(
            "❌ Your latest payment has status: {}. Please contact support.",
            status
        ))
    }

    pub fn no_payments(&self) -> OutboundMessage {
        OutboundMessage::text("⚠️ No payments found. Start over with /start.")
    }

    pub fn payment_link_foreign(&self) -> OutboundMessage {
        OutboundMessage::text("⚠️ This link is not for you.")
    }

    pub fn purchase_unavailable(&self) -> OutboundMessage {
        OutboundMessage::text("⚠️ Could not create a payment. Please try again later.")
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Sweeper
    // ════════════════════════════════════════════════════════════════════════════

    pub fn renewal_reminder(&self, days_left: u32, purchase_url: Option<&str>) -> OutboundMessage {
        let message = OutboundMessage::text(format!(
            "⚠️ <b>Your subscription ends in {} {}!</b>\n\n\
             Please extend it to keep your access to the channel.\n\
             💳 Price: {}",
            days_left,
            if days_left == 1 { "day" } else { "days" },
            self.price_line()
        ));
        match purchase_url {
            Some(url) => message.with_button(Button::url("💳 Extend subscription", url)),
            None => message.with_button(Button::callback("🔍 Check subscription", callbacks::CHECK)),
        }
    }

    pub fn subscription_expired(&self, purchase_url: Option<&str>) -> OutboundMessage {
        let message = OutboundMessage::text(format!(
            "❌ <b>Your subscription has expired</b>\n\n\
             You have been removed from the channel.\n\
             To regain access, please extend your subscription.\n\
             💳 Price: {}",
            self.price_line()
        ));
        match purchase_url {
            Some(url) => message.with_button(Button::url("💳 Extend subscription", url)),
            None => message.with_button(Button::callback("🔍 Check subscription", callbacks::CHECK)),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Membership gate
    // ════════════════════════════════════════════════════════════════════════════

    pub fn join_denied(&self) -> OutboundMessage {
        OutboundMessage::text(
            "❌ You do not have an active subscription. Please subscribe with /start.",
        )
    }

    pub fn joined_welcome(&self, state: &EntitlementState) -> OutboundMessage {
        OutboundMessage::text(format!(
            "Welcome to the club! 🌿\n\n\
             You just joined, so earlier posts are not visible yet. That is expected:\n\
             content is visible from the moment you join, and new practices arrive every day.\n\n\
             Subscription type: {}\n\
             Days left: {}\n\
             Ends: {}\n\n\
             Questions are welcome in our chat: {}",
            kind_label(state.kind),
            state.days_left,
            format_date(state.period_end),
            self.community_chat_link
        ))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Help and admin
    // ════════════════════════════════════════════════════════════════════════════

    pub fn help(&self, is_admin: bool) -> OutboundMessage {
        let mut text = String::from(
            "📚 <b>Bot commands</b>\n\n\
             /start - Start and get access to the channel\n\
             /check - Check your subscription\n\
             /rejoin - Get a new channel link if you left\n\
             /check_payment - Check your latest payment\n\
             /help - Show this message\n",
        );
        if is_admin {
            text.push_str("/admin - Open the administrator menu\n");
        }
        OutboundMessage::text(text)
    }

    pub fn admin_menu(&self) -> OutboundMessage {
        OutboundMessage::text("🔧 <b>Administrator menu</b>\n\nChoose an action:").with_button(
            Button::callback("📋 Registered active users", callbacks::REMOVE_INACTIVE),
        )
    }

    pub fn active_users(&self, users: &[User]) -> OutboundMessage {
        if users.is_empty() {
            return OutboundMessage::text("ℹ️ There are no active users.");
        }
        let list = users
            .iter()
            .map(|u| format!("👤 ID: {}, Name: {}", u.user_id, display_name(u.display_name.as_deref())))
            .collect::<Vec<_>>()
            .join("\n");
        OutboundMessage::text(format!(
            "📋 <b>Active users ({}):</b>\n\n{}\n\n\
             ℹ️ Bots cannot list members of a private channel. Compare this list with the \
             channel's member list manually.",
            users.len(),
            list
        ))
    }

    pub fn forbidden(&self) -> OutboundMessage {
        OutboundMessage::text("⚠️ Access denied!")
    }

    pub fn unknown_action(&self) -> OutboundMessage {
        OutboundMessage::text("⚠️ Unknown action. Please use the menu buttons.")
    }

    pub fn generic_error(&self) -> OutboundMessage {
        OutboundMessage::text("⚠️ Something went wrong. Please try again later.")
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Operator alerts
    // ════════════════════════════════════════════════════════════════════════════

    pub fn alert_new_payment(
        &self,
        user_id: UserId,
        name: Option<&str>,
        amount: &Money,
        payment_id: &PaymentId,
    ) -> String {
        format!(
            "💳 <b>New payment</b>\n👤 User: {} ({})\n💰 Amount: {}\n🆔 Payment ID: {}",
            user_id,
            display_name(name),
            amount,
            escape_html(payment_id.as_str())
        )
    }

    pub fn alert_removed(&self, user_id: UserId, name: Option<&str>) -> String {
        format!(
            "✅ User {} ({}) removed from the channel: subscription expired",
            user_id,
            display_name(name)
        )
    }

    pub fn alert_failure(&self, context: &str, user_id: Option<UserId>, error: &str) -> String {
        match user_id {
            Some(user_id) => format!(
                "⚠️ Error in {} for user {}: {}",
                context,
                user_id,
                escape_html(error)
            ),
            None => format!("⚠️ Error in {}: {}", context, escape_html(error)),
        }
    }
}

fn kind_label(kind: EntitlementKind) -> &'static str {
    match kind {
        EntitlementKind::Paid => "paid",
        EntitlementKind::Trial => "trial",
        EntitlementKind::None => "none",
    }
}

fn format_date(at: Option<Timestamp>) -> String {
    at.map(|t| t.as_datetime().format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn display_name(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => format!("@{}", escape_html(name)),
        _ => "no name".to_string(),
    }
}

/// Escapes the characters Telegram's HTML parse mode treats specially.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}
