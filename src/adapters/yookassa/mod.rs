//! YooKassa payment gateway adapter.
//!
//! - `YooKassaGateway` - `PaymentGateway` over the v3 REST API
//! - `api_types` - Wire objects, including payment notifications

pub mod api_types;
mod gateway;

pub use api_types::NotificationObject;
pub use gateway::{YooKassaConfig, YooKassaGateway};
