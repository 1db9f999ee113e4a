//! Normalizes provider event objects into canonical projections.
//!
//! Supported event types produce customer/subscription/invoice
//! projections; unsupported types produce none. A supported event whose
//! object does not have the expected shape is a high-severity
//! business-logic error.

use serde::Deserialize;
use std::collections::HashMap;

use super::event::{CanonicalEvent, EventKind};
use crate::domain::sync::{ErrorSeverity, SyncError};

/// Customer as seen by the payments provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerProjection {
    pub external_customer_id: String,
    /// Empty for subscription lifecycle events; resolved by lookup.
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Subscription as seen by the payments provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionProjection {
    pub external_subscription_id: String,
    pub external_customer_id: String,
    /// Absent when a checkout session did not expand its line items.
    pub price_id: Option<String>,
    /// Raw payments status string (`active`, `past_due`, ...).
    pub status: Option<String>,
}

/// Invoice reference used to trigger a subscription re-sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceProjection {
    pub invoice_id: String,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
}

/// Projections extracted from one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projections {
    pub customer: Option<CustomerProjection>,
    pub subscription: Option<SubscriptionProjection>,
    pub invoice: Option<InvoiceProjection>,
}

impl Projections {
    pub fn is_empty(&self) -> bool {
        self.customer.is_none() && self.subscription.is_none() && self.invoice.is_none()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Provider object shapes
// ════════════════════════════════════════════════════════════════════════════

/// A Stripe reference that may be a bare id or an expanded object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PricedItem {
    price: Option<PriceRef>,
}

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    data: Vec<PricedItem>,
}

impl ItemList {
    fn first_price(&self) -> Option<String> {
        self.data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    customer: Option<Expandable>,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
    subscription: Option<Expandable>,
    line_items: Option<ItemList>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: Expandable,
    status: String,
    items: Option<ItemList>,
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    id: String,
    customer: Option<Expandable>,
    subscription: Option<Expandable>,
}

// ════════════════════════════════════════════════════════════════════════════
// Extraction
// ════════════════════════════════════════════════════════════════════════════

/// Extracts canonical projections from a verified event.
pub fn extract(event: &CanonicalEvent) -> Result<Projections, SyncError> {
    match event.kind() {
        EventKind::CheckoutSessionCompleted => extract_checkout(event),
        EventKind::SubscriptionCreated
        | EventKind::SubscriptionUpdated
        | EventKind::SubscriptionDeleted => extract_subscription(event),
        EventKind::InvoicePaymentSucceeded | EventKind::InvoicePaymentFailed => {
            extract_invoice(event)
        }
        EventKind::Unsupported => Ok(Projections::default()),
    }
}

fn malformed(event: &CanonicalEvent, reason: impl std::fmt::Display) -> SyncError {
    SyncError::business_logic(format!(
        "Malformed {} payload: {}",
        event.event_type, reason
    ))
    .with_severity(ErrorSeverity::High)
    .with_context("event_id", event.event_id.clone())
    .with_context("event_type", event.event_type.clone())
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &CanonicalEvent) -> Result<T, SyncError> {
    serde_json::from_value(event.payload.clone()).map_err(|e| malformed(event, e))
}

fn extract_checkout(event: &CanonicalEvent) -> Result<Projections, SyncError> {
    let session: CheckoutSessionObject = parse_object(event)?;

    // One-time payment sessions have no subscription to provision.
    let Some(subscription_id) = session.subscription.map(Expandable::into_id) else {
        return Ok(Projections::default());
    };
    let customer_id = session
        .customer
        .map(Expandable::into_id)
        .ok_or_else(|| malformed(event, "missing customer"))?;

    let (details_email, name) = match session.customer_details {
        Some(details) => (details.email, details.name),
        None => (None, None),
    };
    let email = details_email.or(session.customer_email);

    let price_id = session
        .line_items
        .as_ref()
        .and_then(ItemList::first_price)
        .or_else(|| session.metadata.get("price_id").cloned());

    Ok(Projections {
        customer: Some(CustomerProjection {
            external_customer_id: customer_id.clone(),
            email,
            name,
        }),
        subscription: Some(SubscriptionProjection {
            external_subscription_id: subscription_id,
            external_customer_id: customer_id,
            price_id,
            status: None,
        }),
        invoice: None,
    })
}

fn extract_subscription(event: &CanonicalEvent) -> Result<Projections, SyncError> {
    let sub: SubscriptionObject = parse_object(event)?;
    let customer_id = sub.customer.into_id();
    let price_id = sub.items.as_ref().and_then(ItemList::first_price);

    Ok(Projections {
        customer: Some(CustomerProjection {
            external_customer_id: customer_id.clone(),
            email: None,
            name: None,
        }),
        subscription: Some(SubscriptionProjection {
            external_subscription_id: sub.id,
            external_customer_id: customer_id,
            price_id,
            status: Some(sub.status),
        }),
        invoice: None,
    })
}

fn extract_invoice(event: &CanonicalEvent) -> Result<Projections, SyncError> {
    let invoice: InvoiceObject = parse_object(event)?;

    Ok(Projections {
        customer: None,
        subscription: None,
        invoice: Some(InvoiceProjection {
            invoice_id: invoice.id,
            external_customer_id: invoice.customer.map(Expandable::into_id),
            external_subscription_id: invoice.subscription.map(Expandable::into_id),
        }),
    })
}
