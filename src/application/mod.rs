//! Application layer - Commands, Queries, Handlers and background services.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

use std::sync::Arc;

use mockable::Clock;

use crate::domain::foundation::Timestamp;

pub mod alerts;
pub mod handlers;
pub mod messages;
pub mod sweeper;

pub use alerts::OperationalAlerts;
pub use handlers::subscription::{
    // Commands
    ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult,
    MembershipChangeCommand, MembershipChangeHandler, MembershipChangeResult,
    PurchaseSettings, RegisterUserCommand, RegisterUserHandler, RegisterUserResult,
    StartPurchaseCommand, StartPurchaseHandler, StartPurchaseResult,
    // Queries
    CheckAccessHandler, CheckAccessQuery, CheckAccessResult,
    CheckPaymentHandler, CheckPaymentQuery, CheckPaymentResult,
    ListActiveUsersHandler, ListActiveUsersQuery, ListActiveUsersResult,
    RejoinHandler, RejoinQuery, RejoinResult,
};
pub use messages::MessageCatalog;
pub use sweeper::{ExpirySweeper, SweepReport, SweeperConfig};

/// Injected time source shared by handlers and services.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub(crate) fn now_from(clock: &SharedClock) -> Timestamp {
    Timestamp::from_datetime(clock.utc())
}
