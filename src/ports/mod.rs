//! Ports - Interfaces between the sync engine and the outside world.
//!
//! # Module Organization
//!
//! - External providers: `PaymentProvider`, `ProvisioningProvider`
//! - Persistence: customer, subscription, plan mapping and webhook ledger repositories
//! - Operations: `AlertNotifier`

mod alert_notifier;
mod customer_repository;
mod payment_provider;
mod plan_mapping_repository;
mod provisioning_provider;
mod subscription_repository;
mod webhook_log_repository;

pub use alert_notifier::AlertNotifier;
pub use customer_repository::CustomerRepository;
pub use payment_provider::{
    PaymentError, PaymentErrorCode, PaymentProvider, PaymentsCustomer, PaymentsSubscription,
};
pub use plan_mapping_repository::PlanMappingRepository;
pub use provisioning_provider::{
    CreateCustomerRequest, CreateSubscriptionRequest, ProvisionedCustomer,
    ProvisionedSubscription, ProvisioningError, ProvisioningErrorCode, ProvisioningProvider,
    UpdateCustomerRequest,
};
pub use subscription_repository::{SubscriptionRepository, SubscriptionSummary};
pub use webhook_log_repository::{RecordOutcome, WebhookLogRepository};
