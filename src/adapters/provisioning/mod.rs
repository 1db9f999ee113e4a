//! Provisioning provider adapters.
//!
//! - `HttpProvisioningAdapter` talks to the hosting provider's REST API
//! - `MockProvisioningProvider` is an in-memory stand-in for tests

mod http_provisioning_adapter;
mod mock_provisioning_provider;

pub use http_provisioning_adapter::{HttpProvisioningAdapter, ProvisioningConfig};
pub use mock_provisioning_provider::MockProvisioningProvider;
