//! Subscription repository port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, SubscriptionId};
use crate::domain::sync::{Subscription, SubscriptionStatus};

/// Subscription counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub active: u64,
    pub suspended: u64,
    pub canceled: u64,
    pub total: u64,
}

/// Repository port for Subscription persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a new subscription.
    ///
    /// # Errors
    ///
    /// - `Conflict` if either external id is already taken
    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update status, plan and timestamps of an existing subscription.
    ///
    /// The provisioning subscription id is never changed.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_payments_id(
        &self,
        payments_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_provisioning_id(
        &self,
        provisioning_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All subscriptions whose status is one of `statuses`, oldest first.
    async fn list_by_statuses(
        &self,
        statuses: &[SubscriptionStatus],
    ) -> Result<Vec<Subscription>, DomainError>;

    async fn summary(&self) -> Result<SubscriptionSummary, DomainError>;
}
