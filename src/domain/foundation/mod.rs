//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps and error types that form the vocabulary
//! of the subscription domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ChannelId, PaymentId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
