//! Subscription Sync - Webhook ingestion and reconciliation engine
//!
//! Keeps a hosting provisioning system in step with a payments provider:
//! verified webhooks are recorded in an idempotent ledger and routed to
//! reconciliation handlers, and a bulk sync re-converges every known
//! subscription independently of event delivery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
