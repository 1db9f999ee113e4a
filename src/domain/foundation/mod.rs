//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the subscription sync domain.

mod email;
mod errors;
mod ids;
mod timestamp;

pub use email::Email;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CustomerId, SubscriptionId};
pub use timestamp::Timestamp;
