//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence
//!
//! - `SubscriptionStore` - Users and payments, with atomic extension and
//!   lapse-checked deactivation
//!
//! ## Collaborators
//!
//! - `PaymentGateway` - Create payments, read their status and owner
//! - `ChannelManager` - Invite links, revocation, membership queries
//! - `Notifier` - Direct messages to users and operators

mod channel_manager;
mod notifier;
mod payment_gateway;
mod subscription_store;

pub use channel_manager::{ChannelError, ChannelManager, InviteLink, MemberStatus, RevokeOutcome};
pub use notifier::{Button, Delivery, Notifier, NotifyError, OutboundMessage};
pub use payment_gateway::{
    CreatePaymentRequest, CreatedPayment, GatewayPayment, PaymentError, PaymentErrorCode,
    PaymentGateway,
};
pub use subscription_store::{ExtensionOutcome, ExtensionRequest, StoreError, SubscriptionStore};
