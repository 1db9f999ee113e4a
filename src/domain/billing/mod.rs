//! Billing module - Payments provider events, their verification and
//! normalization into canonical projections.

mod event;
mod extractor;
mod webhook_verifier;

#[cfg(test)]
pub use event::CanonicalEventBuilder;
pub use event::{CanonicalEvent, EventKind, PaymentsEvent, PaymentsEventData};
pub use extractor::{
    extract, CustomerProjection, InvoiceProjection, Projections, SubscriptionProjection,
};
pub use webhook_verifier::{
    sign_payload, SignatureHeader, WebhookError, WebhookVerifier, DEFAULT_TOLERANCE_SECS,
};
