//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `stripe` - Payments provider (Stripe REST) and its mock
//! - `provisioning` - Provisioning provider (REST) and its mock
//! - `postgres` - SQL repositories
//! - `memory` - In-memory repositories
//! - `alerting` - Critical error notifiers
//! - `http` - axum routes
//! - `plan_mapping_seed` - YAML plan mapping loader

pub mod alerting;
pub mod http;
pub mod memory;
pub mod plan_mapping_seed;
pub mod postgres;
pub mod provisioning;
pub mod stripe;
