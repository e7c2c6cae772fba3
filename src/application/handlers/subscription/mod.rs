//! Subscription handlers.
//!
//! Command and query handlers for the subscription lifecycle:
//!
//! ## Commands
//! - Registering users on first contact
//! - Starting a purchase
//! - Confirming a payment (the only path that grants a paid period)
//! - Gating channel joins
//!
//! ## Queries
//! - Check access, rejoin
//! - Latest payment status (reconciles unfinished payments)
//! - Active users (operators only)

mod check_access;
mod check_payment;
mod confirm_payment;
mod list_active_users;
mod membership_change;
mod register_user;
mod rejoin;
mod start_purchase;

#[cfg(test)]
pub(crate) mod test_support;

// Commands
pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};
pub use membership_change::{
    MembershipChangeCommand, MembershipChangeHandler, MembershipChangeResult,
};
pub use register_user::{RegisterUserCommand, RegisterUserHandler, RegisterUserResult};
pub use start_purchase::{
    PurchaseSettings, StartPurchaseCommand, StartPurchaseHandler, StartPurchaseResult,
};

// Queries
pub use check_access::{CheckAccessHandler, CheckAccessQuery, CheckAccessResult};
pub use check_payment::{CheckPaymentHandler, CheckPaymentQuery, CheckPaymentResult};
pub use list_active_users::{ListActiveUsersHandler, ListActiveUsersQuery, ListActiveUsersResult};
pub use rejoin::{RejoinHandler, RejoinQuery, RejoinResult};
