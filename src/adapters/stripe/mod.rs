//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe, plus a programmable
//! mock for tests.
//!
//! # Security
//!
//! - The API key is held in `secrecy::SecretString` and sent via basic auth
//! - Webhook signatures are verified in `domain::billing`, not here

mod api_types;
mod mock_payment_provider;
mod stripe_adapter;

pub use api_types::{StripeCustomer, StripeSubscription};
pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
