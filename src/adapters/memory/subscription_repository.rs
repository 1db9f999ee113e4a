//! In-memory subscription repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::domain::sync::{Subscription, SubscriptionStatus};
use crate::ports::{SubscriptionRepository, SubscriptionSummary};

/// In-memory storage for subscriptions.
///
/// `fail_next_updates` makes the next N updates fail with a database
/// error, for exercising partial-failure paths.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    update_failures: Arc<AtomicU32>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_updates(&self, count: u32) {
        self.update_failures.store(count, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut map = self.subscriptions.write().await;
        let duplicate = map.values().any(|s| {
            s.id == subscription.id
                || s.provisioning_subscription_id == subscription.provisioning_subscription_id
                || (s.payments_subscription_id.is_some()
                    && s.payments_subscription_id == subscription.payments_subscription_id)
        });
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                "Subscription already exists",
            ));
        }
        map.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let remaining = self.update_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.update_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DomainError::database("Simulated update failure"));
        }

        let mut map = self.subscriptions.write().await;
        let existing = map
            .get_mut(&subscription.id)
            .ok_or_else(|| DomainError::not_found("Subscription", subscription.id))?;
        let provisioning_subscription_id = existing.provisioning_subscription_id.clone();
        *existing = subscription.clone();
        existing.provisioning_subscription_id = provisioning_subscription_id;
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn find_by_payments_id(
        &self,
        payments_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let map = self.subscriptions.read().await;
        Ok(map
            .values()
            .find(|s| s.payments_subscription_id.as_deref() == Some(payments_subscription_id))
            .cloned())
    }

    async fn find_by_provisioning_id(
        &self,
        provisioning_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let map = self.subscriptions.read().await;
        Ok(map
            .values()
            .find(|s| s.provisioning_subscription_id == provisioning_subscription_id)
            .cloned())
    }

    async fn list_by_statuses(
        &self,
        statuses: &[SubscriptionStatus],
    ) -> Result<Vec<Subscription>, DomainError> {
        let map = self.subscriptions.read().await;
        let mut matching: Vec<Subscription> = map
            .values()
            .filter(|s| statuses.contains(&s.status))
            .cloned()
            .collect();
        matching.sort_by_key(|s| s.created_at);
        Ok(matching)
    }

    async fn summary(&self) -> Result<SubscriptionSummary, DomainError> {
        let map = self.subscriptions.read().await;
        let mut summary = SubscriptionSummary::default();
        for sub in map.values() {
            match sub.status {
                SubscriptionStatus::Active => summary.active += 1,
                SubscriptionStatus::Suspended => summary.suspended += 1,
                SubscriptionStatus::Canceled => summary.canceled += 1,
            }
            summary.total += 1;
        }
        Ok(summary)
    }
}
