//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `subscription` - Users, payments, entitlement and extension rules

pub mod foundation;
pub mod subscription;
