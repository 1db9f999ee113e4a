//! Application handlers.
//!
//! - `webhook`: intake, dispatch and ledger retention
//! - `subscription`: onboarding, lifecycle reconciliation, bulk sync
//! - `customer`: admin customer operations

pub mod customer;
pub mod subscription;
pub mod webhook;
