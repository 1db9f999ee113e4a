//! UpdateSubscriptionHandler - Reconciles `customer.subscription.created`
//! and `customer.subscription.updated` events.

use std::sync::Arc;

use async_trait::async_trait;

use super::change_plan::{ChangePlanHandler, PlanChange};
use crate::application::handlers::webhook::{missing_projection, HandlerOutcome, WebhookEventHandler};
use crate::application::{with_retry, RequestContext, RetryPolicy};
use crate::domain::billing::{CanonicalEvent, EventKind, Projections};
use crate::domain::sync::{
    required_action, target_for_payments_status, ProvisioningAction, Subscription, SyncError,
};
use crate::ports::{ProvisioningProvider, SubscriptionRepository};

/// Applies a suspend or reactivate against the provisioning system.
pub(crate) async fn apply_provisioning_action(
    provisioning: &Arc<dyn ProvisioningProvider>,
    retry: &RetryPolicy,
    provisioning_subscription_id: &str,
    action: ProvisioningAction,
) -> Result<(), SyncError> {
    match action {
        ProvisioningAction::Reactivate => {
            with_retry(retry, "provisioning_reactivate", move || {
                provisioning.reactivate_subscription(provisioning_subscription_id)
            })
            .await
        }
        ProvisioningAction::Suspend => {
            with_retry(retry, "provisioning_suspend", move || {
                provisioning.suspend_subscription(provisioning_subscription_id)
            })
            .await
        }
    }
}

/// Looks up a subscription by its payments-system id, with retry.
pub(crate) async fn find_by_payments_id(
    subscriptions: &Arc<dyn SubscriptionRepository>,
    retry: &RetryPolicy,
    payments_subscription_id: &str,
) -> Result<Option<Subscription>, SyncError> {
    with_retry(retry, "find_subscription", move || {
        subscriptions.find_by_payments_id(payments_subscription_id)
    })
    .await
}

pub struct UpdateSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    provisioning: Arc<dyn ProvisioningProvider>,
    change_plan: ChangePlanHandler,
    retry: RetryPolicy,
}

impl UpdateSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        provisioning: Arc<dyn ProvisioningProvider>,
        change_plan: ChangePlanHandler,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            subscriptions,
            provisioning,
            change_plan,
            retry,
        }
    }
}

#[async_trait]
impl WebhookEventHandler for UpdateSubscriptionHandler {
    fn handles(&self) -> Vec<EventKind> {
        vec![EventKind::SubscriptionCreated, EventKind::SubscriptionUpdated]
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        event: &CanonicalEvent,
        projections: &Projections,
    ) -> Result<HandlerOutcome, SyncError> {
        let projection = projections
            .subscription
            .as_ref()
            .ok_or_else(|| missing_projection(event, "subscription"))?;
        let external_id = projection.external_subscription_id.as_str();

        let Some(mut subscription) =
            find_by_payments_id(&self.subscriptions, &self.retry, external_id).await?
        else {
            if event.kind() == EventKind::SubscriptionCreated {
                tracing::info!(
                    request_id = %ctx.request_id,
                    payments_subscription_id = external_id,
                    "Subscription not yet known, creation is owned by checkout completion"
                );
                return Ok(HandlerOutcome::Skipped(format!(
                    "Subscription {} not yet onboarded",
                    external_id
                )));
            }
            return Err(SyncError::business_logic(format!(
                "Subscription {} not found",
                external_id
            ))
            .with_context("payments_subscription_id", external_id));
        };

        let raw_status = projection.status.as_deref().unwrap_or_default();
        let Some(target) = target_for_payments_status(raw_status) else {
            tracing::info!(
                request_id = %ctx.request_id,
                subscription_id = %subscription.id,
                payments_status = raw_status,
                "No status policy for payments status, leaving subscription unchanged"
            );
            return Ok(HandlerOutcome::Skipped(format!(
                "No status policy for {}",
                raw_status
            )));
        };

        // Plan change errors are returned after the status has converged.
        let plan_result = match projection.price_id.as_deref() {
            Some(price_id) => self.change_plan.handle(ctx, &mut subscription, price_id).await,
            None => Ok(PlanChange::Unchanged),
        };

        let provisioning = &self.provisioning;
        let provisioning_id = subscription.provisioning_subscription_id.as_str();
        let current = with_retry(&self.retry, "provisioning_get_subscription", move || {
            provisioning.get_subscription(provisioning_id)
        })
        .await?
        .ok_or_else(|| {
            SyncError::business_logic(format!(
                "Provisioning subscription {} not found",
                provisioning_id
            ))
            .with_context("subscription_id", subscription.id.to_string())
        })?;

        let action = required_action(&target, current.status);
        if let Some(action) = action {
            apply_provisioning_action(&self.provisioning, &self.retry, provisioning_id, action)
                .await?;
        }

        let mut updated = subscription.clone();
        updated.transition_to(target.status);
        let subscriptions = &self.subscriptions;
        let updated_ref = &updated;
        with_retry(&self.retry, "update_subscription_status", move || {
            subscriptions.update(updated_ref)
        })
        .await?;

        let plan_change = plan_result?;
        tracing::info!(
            request_id = %ctx.request_id,
            subscription_id = %updated.id,
            status = updated.status.as_str(),
            action = action.map(|a| a.as_str()).unwrap_or("none"),
            "Subscription reconciled"
        );
        let mut description = format!("Subscription {} is {}", updated.id, updated.status.as_str());
        if let PlanChange::Unmapped { external_plan_id } = &plan_change {
            description.push_str(&format!(
                ", plan change skipped: no mapping for {}",
                external_plan_id
            ));
        }
        Ok(HandlerOutcome::Applied(description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPlanMappingRepository, InMemorySubscriptionRepository};
    use crate::adapters::provisioning::MockProvisioningProvider;
    use crate::application::handlers::webhook::EventDispatcher;
    use crate::application::PlanMappingResolver;
    use crate::domain::billing::CanonicalEventBuilder;
    use crate::domain::foundation::CustomerId;
    use crate::domain::sync::{
        ErrorCategory, PlanMapping, ProvisioningStatus, SubscriptionStatus,
    };
    use crate::ports::ProvisionedSubscription;
    use serde_json::json;

    struct Fixture {
        dispatcher: EventDispatcher,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        provisioning: Arc<MockProvisioningProvider>,
        subscription: Subscription,
    }

    async fn fixture() -> Fixture {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let provisioning = Arc::new(MockProvisioningProvider::new());
        let mappings = Arc::new(InMemoryPlanMappingRepository::with_mappings(vec![
            PlanMapping::new("stripe", "price_basic", "basic-hosting-plan"),
            PlanMapping::new("stripe", "price_pro_monthly", "pro-hosting-plan"),
        ]));

        let subscription = Subscription::new(
            CustomerId::new(),
            "prov_sub_1",
            Some("sub_1".into()),
            "basic-hosting-plan",
        );
        subscriptions.create(&subscription).await.unwrap();
        provisioning.add_subscription(ProvisionedSubscription {
            id: "prov_sub_1".into(),
            customer_id: "prov_cus_1".into(),
            plan_id: "basic-hosting-plan".into(),
            status: ProvisioningStatus::Active,
            reference: None,
        });

        let retry = RetryPolicy::immediate(3);
        let change_plan = ChangePlanHandler::new(
            subscriptions.clone(),
            provisioning.clone(),
            PlanMappingResolver::new(mappings),
            "stripe",
            retry.clone(),
        );
        let handler = UpdateSubscriptionHandler::new(
            subscriptions.clone(),
            provisioning.clone(),
            change_plan,
            retry,
        );
        Fixture {
            dispatcher: EventDispatcher::new().register(Arc::new(handler)),
            subscriptions,
            provisioning,
            subscription,
        }
    }

    fn updated_event(status: &str, price: &str) -> CanonicalEvent {
        CanonicalEventBuilder::new("customer.subscription.updated")
            .payload(json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": status,
                "items": { "data": [ { "price": { "id": price } } ] }
            }))
            .build()
    }

    async fn stored(f: &Fixture) -> Subscription {
        f.subscriptions.find_by_id(&f.subscription.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn past_due_suspends_once() {
        let f = fixture().await;
        let ctx = RequestContext::new("test");
        let event = updated_event("past_due", "price_basic");

        f.dispatcher.dispatch(&ctx, &event).await.unwrap();
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
        assert_eq!(stored(&f).await.status, SubscriptionStatus::Suspended);

        // A second reconciliation finds provisioning already suspended.
        f.dispatcher.dispatch(&ctx, &event).await.unwrap();
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
    }

    #[tokio::test]
    async fn active_reactivates_suspended_account() {
        let f = fixture().await;
        f.provisioning.set_status("prov_sub_1", ProvisioningStatus::Suspended);

        f.dispatcher
            .dispatch(&RequestContext::new("test"), &updated_event("active", "price_basic"))
            .await
            .unwrap();

        assert_eq!(f.provisioning.call_count("reactivate_subscription"), 1);
        assert_eq!(
            f.provisioning.subscription("prov_sub_1").unwrap().status,
            ProvisioningStatus::Active
        );
    }

    #[tokio::test]
    async fn canceled_status_stamps_canceled_at() {
        let f = fixture().await;
        f.dispatcher
            .dispatch(&RequestContext::new("test"), &updated_event("canceled", "price_basic"))
            .await
            .unwrap();

        let stored = stored(&f).await;
        assert_eq!(stored.status, SubscriptionStatus::Canceled);
        assert!(stored.canceled_at.is_some());
    }

    #[tokio::test]
    async fn unmapped_status_is_skipped_without_writes() {
        let f = fixture().await;
        let before = stored(&f).await;

        let outcome = f
            .dispatcher
            .dispatch(&RequestContext::new("test"), &updated_event("trialing", "price_basic"))
            .await
            .unwrap();

        assert!(outcome.is_skipped());
        assert_eq!(stored(&f).await, before);
        assert_eq!(f.provisioning.call_count("get_subscription"), 0);
    }

    #[tokio::test]
    async fn unmapped_status_with_new_price_touches_nothing() {
        let f = fixture().await;
        let before = stored(&f).await;

        let outcome = f
            .dispatcher
            .dispatch(
                &RequestContext::new("test"),
                &updated_event("trialing", "price_pro_monthly"),
            )
            .await
            .unwrap();

        assert!(outcome.is_skipped());
        assert!(f.provisioning.calls().is_empty());
        assert_eq!(stored(&f).await, before);
        assert_eq!(
            f.provisioning.subscription("prov_sub_1").unwrap().plan_id,
            "basic-hosting-plan"
        );
    }

    #[tokio::test]
    async fn past_due_with_unmapped_price_still_suspends() {
        let f = fixture().await;

        let outcome = f
            .dispatcher
            .dispatch(&RequestContext::new("test"), &updated_event("past_due", "price_legacy"))
            .await
            .unwrap();

        assert!(!outcome.is_skipped());
        assert!(outcome.description().contains("price_legacy"));
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
        assert_eq!(f.provisioning.call_count("change_plan"), 0);
        let stored = stored(&f).await;
        assert_eq!(stored.status, SubscriptionStatus::Suspended);
        assert_eq!(stored.plan_id, "basic-hosting-plan");
    }

    #[tokio::test]
    async fn failed_plan_change_is_reported_after_status_converges() {
        let f = fixture().await;
        f.provisioning.fail_times(
            "change_plan",
            crate::ports::ProvisioningError::unavailable("503"),
            5,
        );

        let err = f
            .dispatcher
            .dispatch(&RequestContext::new("test"), &updated_event("unpaid", "price_pro_monthly"))
            .await
            .unwrap_err();

        assert_eq!(err.category, ErrorCategory::ExternalApi);
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
        let stored = stored(&f).await;
        assert_eq!(stored.status, SubscriptionStatus::Suspended);
        assert_eq!(stored.plan_id, "basic-hosting-plan");
    }

    #[tokio::test]
    async fn new_price_changes_plan_before_status() {
        let f = fixture().await;
        f.dispatcher
            .dispatch(&RequestContext::new("test"), &updated_event("active", "price_pro_monthly"))
            .await
            .unwrap();

        let calls: Vec<String> = f.provisioning.calls().into_iter().map(|c| c.method).collect();
        assert_eq!(calls.first().map(String::as_str), Some("change_plan"));
        assert_eq!(stored(&f).await.plan_id, "pro-hosting-plan");
    }

    #[tokio::test]
    async fn created_for_unknown_subscription_is_skipped() {
        let f = fixture().await;
        let event = CanonicalEventBuilder::new("customer.subscription.created")
            .payload(json!({ "id": "sub_unknown", "customer": "cus_9", "status": "active" }))
            .build();

        let outcome = f.dispatcher.dispatch(&RequestContext::new("test"), &event).await.unwrap();
        assert!(outcome.is_skipped());
    }

    #[tokio::test]
    async fn updated_for_unknown_subscription_fails() {
        let f = fixture().await;
        let event = CanonicalEventBuilder::new("customer.subscription.updated")
            .payload(json!({ "id": "sub_unknown", "customer": "cus_9", "status": "active" }))
            .build();

        let err = f.dispatcher.dispatch(&RequestContext::new("test"), &event).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::BusinessLogic);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn transient_suspend_failure_is_retried() {
        let f = fixture().await;
        f.provisioning.fail_times(
            "suspend_subscription",
            crate::ports::ProvisioningError::unavailable("503"),
            2,
        );

        f.dispatcher
            .dispatch(&RequestContext::new("test"), &updated_event("unpaid", "price_basic"))
            .await
            .unwrap();

        assert_eq!(f.provisioning.call_count("suspend_subscription"), 3);
        assert_eq!(stored(&f).await.status, SubscriptionStatus::Suspended);
    }
}
