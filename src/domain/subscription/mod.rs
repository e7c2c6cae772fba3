//! Subscription domain module.
//!
//! Users, payments, and the rules that turn them into channel access.
//!
//! # Module Structure
//!
//! - `user` - User entity with trial and paid-period facts
//! - `payment` - Payment entity and `Money`
//! - `status` - PaymentStatus state machine (forward-only)
//! - `entitlement` - Pure entitlement engine
//! - `extension` - Where a newly purchased period ends
//! - `terms` - Trial and period lengths

mod entitlement;
mod errors;
mod extension;
mod payment;
mod status;
mod terms;
mod user;

pub use entitlement::{
    ceil_days_until, compute_state, is_lapsed, EntitlementKind, EntitlementState,
};
pub use errors::SubscriptionError;
pub use extension::next_subscription_end;
pub use payment::{Money, Payment};
pub use status::PaymentStatus;
pub use terms::SubscriptionTerms;
pub use user::User;
