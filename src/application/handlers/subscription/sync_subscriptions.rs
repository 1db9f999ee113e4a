//! SyncSubscriptionsHandler - Bulk and single-item reconciliation.
//!
//! Each item re-reads the internal record, the payments subscription and
//! the provisioning subscription, then converges provisioning and the
//! internal record independently. Items are independent, so an interrupted
//! sweep can simply be run again.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::update_subscription::{apply_provisioning_action, find_by_payments_id};
use crate::application::handlers::webhook::{missing_projection, HandlerOutcome, WebhookEventHandler};
use crate::application::{with_retry, RequestContext, RetryPolicy};
use crate::domain::billing::{CanonicalEvent, EventKind, Projections};
use crate::domain::foundation::SubscriptionId;
use crate::domain::sync::{
    required_action, target_for_payments_status, Subscription, SubscriptionStatus, SyncError,
};
use crate::ports::{PaymentProvider, ProvisioningProvider, SubscriptionRepository};

pub const DEFAULT_SYNC_CONCURRENCY: usize = 4;

/// Addresses a single subscription for a targeted sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionSelector {
    Id(SubscriptionId),
    PaymentsId(String),
}

impl SubscriptionSelector {
    /// Internal UUIDs select by id; anything else is a payments id.
    pub fn parse(value: &str) -> Self {
        match value.parse::<SubscriptionId>() {
            Ok(id) => SubscriptionSelector::Id(id),
            Err(_) => SubscriptionSelector::PaymentsId(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItemError {
    pub subscription_id: SubscriptionId,
    pub message: String,
}

/// Result of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Items reconciled without error, changed or not.
    pub synced: usize,
    pub errors: Vec<SyncItemError>,
}

impl SyncSummary {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone)]
pub struct SyncSubscriptionsHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentProvider>,
    provisioning: Arc<dyn ProvisioningProvider>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl SyncSubscriptionsHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentProvider>,
        provisioning: Arc<dyn ProvisioningProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            provisioning,
            retry,
            concurrency: DEFAULT_SYNC_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reconciles every active or suspended subscription.
    pub async fn sync_all(&self, ctx: &RequestContext) -> Result<SyncSummary, SyncError> {
        let subscriptions = &self.subscriptions;
        let statuses = [SubscriptionStatus::Active, SubscriptionStatus::Suspended];
        let statuses_ref = &statuses[..];
        let items = with_retry(&self.retry, "list_subscriptions", move || {
            subscriptions.list_by_statuses(statuses_ref)
        })
        .await?;

        tracing::info!(
            request_id = %ctx.request_id,
            count = items.len(),
            concurrency = self.concurrency,
            "Starting bulk subscription sync"
        );

        let results: Vec<(SubscriptionId, Result<bool, SyncError>)> = stream::iter(items)
            .map(|subscription| async move {
                let result = self.reconcile(ctx, subscription.id).await;
                (subscription.id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let summary = summarize(ctx, results);
        tracing::info!(
            request_id = %ctx.request_id,
            synced = summary.synced,
            errors = summary.errors.len(),
            "Bulk subscription sync finished"
        );
        Ok(summary)
    }

    /// Reconciles one subscription. `None` when it is not known.
    pub async fn sync_one(
        &self,
        ctx: &RequestContext,
        selector: &SubscriptionSelector,
    ) -> Result<Option<SyncSummary>, SyncError> {
        let subscriptions = &self.subscriptions;
        let found = match selector {
            SubscriptionSelector::Id(id) => {
                with_retry(&self.retry, "find_subscription", move || {
                    subscriptions.find_by_id(id)
                })
                .await?
            }
            SubscriptionSelector::PaymentsId(payments_id) => {
                find_by_payments_id(&self.subscriptions, &self.retry, payments_id).await?
            }
        };

        let Some(subscription) = found else {
            return Ok(None);
        };
        let result = self.reconcile(ctx, subscription.id).await;
        Ok(Some(summarize(ctx, vec![(subscription.id, result)])))
    }

    /// Converges one subscription, retrying the whole read-modify-write.
    ///
    /// Returns whether the internal record changed.
    pub async fn reconcile(
        &self,
        ctx: &RequestContext,
        subscription_id: SubscriptionId,
    ) -> Result<bool, SyncError> {
        with_retry(&self.retry, "reconcile_subscription", move || {
            self.reconcile_once(ctx, subscription_id)
        })
        .await
        .map_err(|err| err.with_context("subscription_id", subscription_id.to_string()))
    }

    async fn reconcile_once(
        &self,
        ctx: &RequestContext,
        subscription_id: SubscriptionId,
    ) -> Result<bool, SyncError> {
        let Some(mut subscription) = self.subscriptions.find_by_id(&subscription_id).await? else {
            return Ok(false);
        };
        let Some(payments_id) = subscription.payments_subscription_id.clone() else {
            tracing::debug!(
                request_id = %ctx.request_id,
                subscription_id = %subscription.id,
                "Subscription has no payments id, nothing to reconcile against"
            );
            return Ok(false);
        };

        let remote = self.payments.get_subscription(&payments_id).await?.ok_or_else(|| {
            SyncError::business_logic(format!("Payments subscription {} not found", payments_id))
        })?;
        let provisioned = self
            .provisioning
            .get_subscription(&subscription.provisioning_subscription_id)
            .await?
            .ok_or_else(|| {
                SyncError::business_logic(format!(
                    "Provisioning subscription {} not found",
                    subscription.provisioning_subscription_id
                ))
            })?;

        let mut changed = false;
        match target_for_payments_status(&remote.status) {
            Some(target) => {
                if let Some(action) = required_action(&target, provisioned.status) {
                    // The surrounding retry re-runs the whole item.
                    apply_provisioning_action(
                        &self.provisioning,
                        &RetryPolicy::immediate(1),
                        &subscription.provisioning_subscription_id,
                        action,
                    )
                    .await?;
                    tracing::info!(
                        request_id = %ctx.request_id,
                        subscription_id = %subscription.id,
                        action = action.as_str(),
                        "Provisioning converged"
                    );
                }
                changed |= subscription.transition_to(target.status);
            }
            None => tracing::debug!(
                request_id = %ctx.request_id,
                subscription_id = %subscription.id,
                payments_status = %remote.status,
                "No status policy for payments status"
            ),
        }

        changed |= converge_plan(&mut subscription, &provisioned.plan_id);

        if changed {
            self.subscriptions.update(&subscription).await?;
            tracing::info!(
                request_id = %ctx.request_id,
                subscription_id = %subscription.id,
                status = subscription.status.as_str(),
                plan_id = %subscription.plan_id,
                "Internal subscription converged"
            );
        }
        Ok(changed)
    }
}

/// The provisioning system decides entitlement.
fn converge_plan(subscription: &mut Subscription, provisioning_plan_id: &str) -> bool {
    subscription.change_plan(provisioning_plan_id)
}

fn summarize(
    ctx: &RequestContext,
    results: Vec<(SubscriptionId, Result<bool, SyncError>)>,
) -> SyncSummary {
    let mut summary = SyncSummary::default();
    for (subscription_id, result) in results {
        match result {
            Ok(_) => summary.synced += 1,
            Err(err) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    subscription_id = %subscription_id,
                    error = %err,
                    "Subscription sync failed"
                );
                summary.errors.push(SyncItemError {
                    subscription_id,
                    message: err.message,
                });
            }
        }
    }
    summary
}

/// Invoice payments re-sync the subscription they bill.
#[async_trait]
impl WebhookEventHandler for SyncSubscriptionsHandler {
    fn handles(&self) -> Vec<EventKind> {
        vec![EventKind::InvoicePaymentSucceeded, EventKind::InvoicePaymentFailed]
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        event: &CanonicalEvent,
        projections: &Projections,
    ) -> Result<HandlerOutcome, SyncError> {
        let invoice = projections
            .invoice
            .as_ref()
            .ok_or_else(|| missing_projection(event, "invoice"))?;
        let Some(payments_id) = invoice.external_subscription_id.as_deref() else {
            return Ok(HandlerOutcome::Skipped(format!(
                "Invoice {} has no subscription",
                invoice.invoice_id
            )));
        };
        let Some(subscription) =
            find_by_payments_id(&self.subscriptions, &self.retry, payments_id).await?
        else {
            return Ok(HandlerOutcome::Skipped(format!(
                "Subscription {} not found",
                payments_id
            )));
        };

        let changed = self.reconcile(ctx, subscription.id).await?;
        Ok(HandlerOutcome::Applied(format!(
            "Subscription {} synced after invoice {}{}",
            subscription.id,
            invoice.invoice_id,
            if changed { "" } else { " (unchanged)" }
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::provisioning::MockProvisioningProvider;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{extract, CanonicalEventBuilder};
    use crate::domain::foundation::CustomerId;
    use crate::domain::sync::ProvisioningStatus;
    use crate::ports::{PaymentError, PaymentsSubscription, ProvisionedSubscription};
    use serde_json::json;

    struct Fixture {
        handler: SyncSubscriptionsHandler,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        payments: Arc<MockPaymentProvider>,
        provisioning: Arc<MockProvisioningProvider>,
    }

    fn fixture() -> Fixture {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let provisioning = Arc::new(MockProvisioningProvider::new());
        let handler = SyncSubscriptionsHandler::new(
            subscriptions.clone(),
            payments.clone(),
            provisioning.clone(),
            RetryPolicy::immediate(2),
        );
        Fixture {
            handler,
            subscriptions,
            payments,
            provisioning,
        }
    }

    async fn seed(
        f: &Fixture,
        n: u32,
        payments_status: &str,
        provisioning_status: ProvisioningStatus,
    ) -> Subscription {
        let subscription = Subscription::new(
            CustomerId::new(),
            format!("prov_sub_{}", n),
            Some(format!("sub_{}", n)),
            "basic-hosting-plan",
        );
        f.subscriptions.create(&subscription).await.unwrap();
        f.payments.add_subscription(PaymentsSubscription {
            id: format!("sub_{}", n),
            customer_id: format!("cus_{}", n),
            status: payments_status.into(),
            price_id: Some("price_basic".into()),
        });
        f.provisioning.add_subscription(ProvisionedSubscription {
            id: format!("prov_sub_{}", n),
            customer_id: format!("prov_cus_{}", n),
            plan_id: "basic-hosting-plan".into(),
            status: provisioning_status,
            reference: None,
        });
        subscription
    }

    async fn status_of(f: &Fixture, subscription: &Subscription) -> SubscriptionStatus {
        f.subscriptions
            .find_by_id(&subscription.id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[test]
    fn selector_parses_uuid_or_payments_id() {
        let id = SubscriptionId::new();
        assert_eq!(
            SubscriptionSelector::parse(&id.to_string()),
            SubscriptionSelector::Id(id)
        );
        assert_eq!(
            SubscriptionSelector::parse("sub_123"),
            SubscriptionSelector::PaymentsId("sub_123".into())
        );
    }

    #[tokio::test]
    async fn sweep_converges_each_subscription() {
        let f = fixture();
        let healthy = seed(&f, 1, "active", ProvisioningStatus::Active).await;
        let overdue = seed(&f, 2, "past_due", ProvisioningStatus::Active).await;
        let recovered = seed(&f, 3, "active", ProvisioningStatus::Suspended).await;

        let summary = f.handler.sync_all(&RequestContext::new("test")).await.unwrap();

        assert_eq!(summary.synced, 3);
        assert!(summary.is_clean());
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
        assert_eq!(f.provisioning.call_count("reactivate_subscription"), 1);
        assert_eq!(status_of(&f, &healthy).await, SubscriptionStatus::Active);
        assert_eq!(status_of(&f, &overdue).await, SubscriptionStatus::Suspended);
        assert_eq!(status_of(&f, &recovered).await, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn canceled_subscriptions_are_not_swept() {
        let f = fixture();
        let mut canceled = seed(&f, 1, "active", ProvisioningStatus::Suspended).await;
        canceled.transition_to(SubscriptionStatus::Canceled);
        f.subscriptions.update(&canceled).await.unwrap();

        let summary = f.handler.sync_all(&RequestContext::new("test")).await.unwrap();

        assert_eq!(summary.synced, 0);
        assert_eq!(f.payments.call_count("get_subscription"), 0);
    }

    #[tokio::test]
    async fn internal_plan_follows_provisioning() {
        let f = fixture();
        let subscription = seed(&f, 1, "active", ProvisioningStatus::Active).await;
        f.provisioning
            .change_plan("prov_sub_1", "pro-hosting-plan")
            .await
            .unwrap();

        f.handler.sync_all(&RequestContext::new("test")).await.unwrap();

        let stored = f.subscriptions.find_by_id(&subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.plan_id, "pro-hosting-plan");
    }

    #[tokio::test]
    async fn unmapped_status_still_converges_plan_only() {
        let f = fixture();
        let subscription = seed(&f, 1, "trialing", ProvisioningStatus::Suspended).await;

        let changed = f
            .handler
            .reconcile(&RequestContext::new("test"), subscription.id)
            .await
            .unwrap();

        assert!(!changed);
        assert_eq!(f.provisioning.call_count("reactivate_subscription"), 0);
    }

    #[tokio::test]
    async fn item_failures_are_collected_not_fatal() {
        let f = fixture();
        seed(&f, 1, "active", ProvisioningStatus::Active).await;
        seed(&f, 2, "active", ProvisioningStatus::Active).await;
        f.payments.fail_times("get_subscription", PaymentError::authentication("revoked"), 1);

        let summary = f
            .handler
            .clone()
            .with_concurrency(1)
            .sync_all(&RequestContext::new("test"))
            .await
            .unwrap();

        assert_eq!(summary.synced, 1);
        assert_eq!(summary.errors.len(), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_per_item() {
        let f = fixture();
        seed(&f, 1, "past_due", ProvisioningStatus::Active).await;
        f.provisioning
            .fail_times("get_subscription", crate::ports::ProvisioningError::network("reset"), 1);

        let summary = f.handler.sync_all(&RequestContext::new("test")).await.unwrap();

        assert_eq!(summary.synced, 1);
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
    }

    #[tokio::test]
    async fn sync_one_by_payments_id() {
        let f = fixture();
        seed(&f, 1, "unpaid", ProvisioningStatus::Active).await;

        let summary = f
            .handler
            .sync_one(
                &RequestContext::new("test"),
                &SubscriptionSelector::PaymentsId("sub_1".into()),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.synced, 1);
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
    }

    #[tokio::test]
    async fn sync_one_unknown_is_none() {
        let f = fixture();
        let result = f
            .handler
            .sync_one(
                &RequestContext::new("test"),
                &SubscriptionSelector::Id(SubscriptionId::new()),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn invoice_failure_triggers_resync() {
        let f = fixture();
        seed(&f, 1, "past_due", ProvisioningStatus::Active).await;
        let event = CanonicalEventBuilder::new("invoice.payment_failed")
            .payload(json!({ "id": "in_1", "customer": "cus_1", "subscription": "sub_1" }))
            .build();

        let outcome = f
            .handler
            .handle(&RequestContext::new("test"), &event, &extract(&event).unwrap())
            .await
            .unwrap();

        assert!(!outcome.is_skipped());
        assert_eq!(f.provisioning.call_count("suspend_subscription"), 1);
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_skipped() {
        let f = fixture();
        let event = CanonicalEventBuilder::new("invoice.payment_succeeded")
            .payload(json!({ "id": "in_1", "customer": "cus_1" }))
            .build();

        let outcome = f
            .handler
            .handle(&RequestContext::new("test"), &event, &extract(&event).unwrap())
            .await
            .unwrap();
        assert!(outcome.is_skipped());
    }
}
