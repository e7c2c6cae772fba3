//! Test doubles for the collaborator ports.
//!
//! Used by unit tests across the crate and by the integration tests in
//! `tests/`. Each double records what it was asked to do and supports
//! error injection.

mod clock;
mod mock_payment_gateway;
mod recording_channel;
mod recording_notifier;

pub use clock::MutableClock;
pub use mock_payment_gateway::{MethodCall, MockPaymentGateway};
pub use recording_channel::RecordingChannel;
pub use recording_notifier::RecordingNotifier;
