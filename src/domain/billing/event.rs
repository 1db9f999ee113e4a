//! Payments provider event envelope and its canonical form.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::sync::idempotency_key;

/// Stripe event envelope.
///
/// Only fields relevant to our processing are captured; the rest of the
/// envelope is kept in [`CanonicalEvent::raw`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentsEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    pub data: PaymentsEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentsEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

/// Event types the reconciliation engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CheckoutSessionCompleted,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    Unsupported,
}

impl EventKind {
    pub fn from_type(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unsupported => "unsupported",
        }
    }
}

/// A verified event in provider-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    /// Provider tag, e.g. `"stripe"`.
    pub provider: String,
    pub event_id: String,
    pub event_type: String,
    pub created_at: Timestamp,
    /// The event's data object.
    pub payload: serde_json::Value,
    /// The whole envelope as received, stored in the ledger.
    pub raw: serde_json::Value,
    pub livemode: bool,
}

impl CanonicalEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from_type(&self.event_type)
    }

    /// Ledger key for this event.
    pub fn idempotency_key(&self) -> String {
        idempotency_key(&self.provider, &self.event_id)
    }
}

/// Builder for creating test events.
#[cfg(test)]
pub struct CanonicalEventBuilder {
    event_id: String,
    event_type: String,
    payload: serde_json::Value,
}

#[cfg(test)]
impl CanonicalEventBuilder {
    pub fn new(event_type: &str) -> Self {
        Self {
            event_id: "evt_test_123".to_string(),
            event_type: event_type.to_string(),
            payload: serde_json::json!({}),
        }
    }

    pub fn event_id(mut self, id: &str) -> Self {
        self.event_id = id.to_string();
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> CanonicalEvent {
        let raw = serde_json::json!({
            "id": self.event_id,
            "type": self.event_type,
            "data": { "object": self.payload.clone() }
        });
        CanonicalEvent {
            provider: crate::domain::sync::STRIPE_PROVIDER.to_string(),
            event_id: self.event_id,
            event_type: self.event_type,
            created_at: Timestamp::now(),
            payload: self.payload,
            raw,
            livemode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_known_types() {
        for kind in [
            EventKind::CheckoutSessionCompleted,
            EventKind::SubscriptionCreated,
            EventKind::SubscriptionUpdated,
            EventKind::SubscriptionDeleted,
            EventKind::InvoicePaymentSucceeded,
            EventKind::InvoicePaymentFailed,
        ] {
            assert_eq!(EventKind::from_type(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_type_is_unsupported() {
        assert_eq!(EventKind::from_type("charge.refunded"), EventKind::Unsupported);
    }

    #[test]
    fn envelope_parses_without_optional_fields() {
        let json = r#"{"id":"evt_1","type":"invoice.paid","created":1704067200,"data":{"object":{}}}"#;
        let event: PaymentsEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, "evt_1");
        assert!(!event.livemode);
        assert!(event.api_version.is_none());
    }

    #[test]
    fn canonical_event_key_uses_provider_prefix() {
        let event = CanonicalEventBuilder::new("invoice.paid").event_id("evt_9").build();
        assert_eq!(event.idempotency_key(), "stripe:evt_9");
    }
}
