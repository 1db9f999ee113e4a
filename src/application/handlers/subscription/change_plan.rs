//! ChangePlanHandler - Moves a subscription to the plan mapped from a new price.
//!
//! The provisioning system is updated first, then the internal record. If
//! the internal write fails the two disagree until the next bulk sync,
//! which converges the internal plan to the provisioning plan.

use std::sync::Arc;

use crate::application::{with_retry, PlanMappingResolver, RequestContext, RetryPolicy};
use crate::domain::sync::{Subscription, SyncError};
use crate::ports::{ProvisioningProvider, SubscriptionRepository};

/// Result of a plan change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanChange {
    Unchanged,
    Changed { from: String, to: String },
    /// The price has no plan mapping; nothing was touched.
    Unmapped { external_plan_id: String },
}

#[derive(Clone)]
pub struct ChangePlanHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    provisioning: Arc<dyn ProvisioningProvider>,
    resolver: PlanMappingResolver,
    provider: String,
    retry: RetryPolicy,
}

impl ChangePlanHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        provisioning: Arc<dyn ProvisioningProvider>,
        resolver: PlanMappingResolver,
        provider: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            subscriptions,
            provisioning,
            resolver,
            provider: provider.into(),
            retry,
        }
    }

    /// Applies the plan mapped from `external_plan_id` to `subscription`.
    ///
    /// On success `subscription` reflects the persisted state. An unmapped
    /// price is reported as [`PlanChange::Unmapped`], not as an error.
    pub async fn handle(
        &self,
        ctx: &RequestContext,
        subscription: &mut Subscription,
        external_plan_id: &str,
    ) -> Result<PlanChange, SyncError> {
        let Some(plan_id) = self.resolver.lookup(&self.provider, external_plan_id).await? else {
            tracing::warn!(
                request_id = %ctx.request_id,
                subscription_id = %subscription.id,
                provider = %self.provider,
                external_plan_id,
                "No plan mapping for price, plan change skipped"
            );
            return Ok(PlanChange::Unmapped {
                external_plan_id: external_plan_id.to_string(),
            });
        };
        if plan_id == subscription.plan_id {
            return Ok(PlanChange::Unchanged);
        }

        let provisioning = &self.provisioning;
        let provisioning_id = subscription.provisioning_subscription_id.as_str();
        let plan_ref = plan_id.as_str();
        with_retry(&self.retry, "provisioning_change_plan", move || {
            provisioning.change_plan(provisioning_id, plan_ref)
        })
        .await?;

        let from = subscription.plan_id.clone();
        let mut updated = subscription.clone();
        updated.change_plan(&plan_id);

        let subscriptions = &self.subscriptions;
        let updated_ref = &updated;
        if let Err(err) = with_retry(&self.retry, "update_subscription_plan", move || {
            subscriptions.update(updated_ref)
        })
        .await
        {
            tracing::warn!(
                request_id = %ctx.request_id,
                subscription_id = %subscription.id,
                provisioning_plan = %plan_id,
                stored_plan = %from,
                "Provisioning plan changed but internal record is stale until next sync"
            );
            return Err(err);
        }

        tracing::info!(
            request_id = %ctx.request_id,
            subscription_id = %subscription.id,
            from = %from,
            to = %plan_id,
            "Subscription plan changed"
        );
        *subscription = updated;
        Ok(PlanChange::Changed { from, to: plan_id })
    }
}
