//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `sync` - Customer/subscription entities, status policy, error classification
//! - `billing` - Payments provider events, signature verification, extraction

pub mod billing;
pub mod foundation;
pub mod sync;
