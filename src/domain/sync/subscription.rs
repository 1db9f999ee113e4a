//! Subscription entity.

use serde::{Deserialize, Serialize};

use super::status::SubscriptionStatus;
use crate::domain::foundation::{CustomerId, SubscriptionId, Timestamp};

/// A hosting subscription tracked across both external systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub customer_id: CustomerId,
    /// Immutable once created.
    pub provisioning_subscription_id: String,
    pub payments_subscription_id: Option<String>,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub canceled_at: Option<Timestamp>,
}

impl Subscription {
    /// Creates a new active subscription.
    pub fn new(
        customer_id: CustomerId,
        provisioning_subscription_id: impl Into<String>,
        payments_subscription_id: Option<String>,
        plan_id: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            customer_id,
            provisioning_subscription_id: provisioning_subscription_id.into(),
            payments_subscription_id,
            plan_id: plan_id.into(),
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
            canceled_at: None,
        }
    }

    /// Moves to `status`. Returns whether anything changed.
    ///
    /// Entering `canceled` stamps `canceled_at`; leaving it clears the stamp.
    pub fn transition_to(&mut self, status: SubscriptionStatus) -> bool {
        if self.status == status {
            return false;
        }
        let now = Timestamp::now();
        self.canceled_at = match status {
            SubscriptionStatus::Canceled => Some(now),
            _ => None,
        };
        self.status = status;
        self.updated_at = now;
        true
    }

    /// Switches to a new provisioning plan. Returns whether anything changed.
    pub fn change_plan(&mut self, plan_id: &str) -> bool {
        if self.plan_id == plan_id {
            return false;
        }
        self.plan_id = plan_id.to_string();
        self.updated_at = Timestamp::now();
        true
    }

    pub fn is_canceled(&self) -> bool {
        self.status == SubscriptionStatus::Canceled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription() -> Subscription {
        Subscription::new(
            CustomerId::new(),
            "prov_sub_1",
            Some("sub_1".to_string()),
            "basic-hosting-plan",
        )
    }

    #[test]
    fn new_subscription_is_active() {
        let sub = subscription();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.canceled_at.is_none());
    }

    #[test]
    fn transition_to_same_status_is_noop() {
        let mut sub = subscription();
        assert!(!sub.transition_to(SubscriptionStatus::Active));
    }

    #[test]
    fn cancel_stamps_canceled_at() {
        let mut sub = subscription();
        assert!(sub.transition_to(SubscriptionStatus::Canceled));
        assert!(sub.canceled_at.is_some());
        assert!(sub.is_canceled());
    }

    #[test]
    fn reactivate_clears_canceled_at() {
        let mut sub = subscription();
        sub.transition_to(SubscriptionStatus::Canceled);
        sub.transition_to(SubscriptionStatus::Active);
        assert!(sub.canceled_at.is_none());
    }

    #[test]
    fn change_plan_reports_change() {
        let mut sub = subscription();
        assert!(sub.change_plan("pro-hosting-plan"));
        assert!(!sub.change_plan("pro-hosting-plan"));
        assert_eq!(sub.plan_id, "pro-hosting-plan");
    }
}
