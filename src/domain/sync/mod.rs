//! Sync module - Entities, status policy and error classification for
//! reconciling the payments and provisioning systems.

mod customer;
mod error;
mod plan_mapping;
mod reconciliation;
mod status;
mod subscription;
mod webhook_log;

pub use customer::Customer;
pub use error::{classify, ErrorCategory, ErrorSeverity, SyncError};
pub use plan_mapping::{PlanMapping, STRIPE_PROVIDER};
pub use reconciliation::{
    required_action, target_for_payments_status, ProvisioningAction, StatusTarget,
};
pub use status::{ProvisioningStatus, SubscriptionStatus};
pub use subscription::Subscription;
pub use webhook_log::{idempotency_key, WebhookLog, WebhookStatus};
