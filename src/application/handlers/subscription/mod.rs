//! Subscription handlers - Onboarding, lifecycle reconciliation and sync.

mod change_plan;
mod delete_subscription;
mod get_subscription_summary;
mod onboard_customer;
mod sync_subscriptions;
mod update_subscription;

pub use change_plan::{ChangePlanHandler, PlanChange};
pub use delete_subscription::DeleteSubscriptionHandler;
pub use get_subscription_summary::GetSubscriptionSummaryHandler;
pub use onboard_customer::{OnboardCustomerHandler, OnboardingStep};
pub use sync_subscriptions::{
    SubscriptionSelector, SyncItemError, SyncSubscriptionsHandler, SyncSummary,
    DEFAULT_SYNC_CONCURRENCY,
};
pub use update_subscription::UpdateSubscriptionHandler;
