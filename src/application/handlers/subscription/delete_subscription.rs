//! DeleteSubscriptionHandler - Handles `customer.subscription.deleted`.

use std::sync::Arc;

use async_trait::async_trait;

use super::update_subscription::{apply_provisioning_action, find_by_payments_id};
use crate::application::handlers::webhook::{missing_projection, HandlerOutcome, WebhookEventHandler};
use crate::application::{with_retry, RequestContext, RetryPolicy};
use crate::domain::billing::{CanonicalEvent, EventKind, Projections};
use crate::domain::sync::{ProvisioningAction, SubscriptionStatus, SyncError};
use crate::ports::{ProvisioningProvider, SubscriptionRepository};

/// Suspends the hosting account and marks the subscription canceled.
///
/// The suspend is issued without first reading the provisioning status.
pub struct DeleteSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    provisioning: Arc<dyn ProvisioningProvider>,
    retry: RetryPolicy,
}

impl DeleteSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        provisioning: Arc<dyn ProvisioningProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            subscriptions,
            provisioning,
            retry,
        }
    }
}

#[async_trait]
impl WebhookEventHandler for DeleteSubscriptionHandler {
    fn handles(&self) -> Vec<EventKind> {
        vec![EventKind::SubscriptionDeleted]
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
            tracing::info!(
                request_id = %ctx.request_id,
                payments_subscription_id = external_id,
                "Deleted subscription is unknown, skipping"
            );
            return Ok(HandlerOutcome::Skipped(format!(
                "Subscription {} not found",
                external_id
            )));
        };

        apply_provisioning_action(
            &self.provisioning,
            &self.retry,
            &subscription.provisioning_subscription_id,
            ProvisioningAction::Suspend,
        )
        .await?;

        subscription.transition_to(SubscriptionStatus::Canceled);
        let subscriptions = &self.subscriptions;
        let subscription_ref = &subscription;
        with_retry(&self.retry, "cancel_subscription", move || {
            subscriptions.update(subscription_ref)
        })
        .await?;

        tracing::info!(
            request_id = %ctx.request_id,
            subscription_id = %subscription.id,
            "Subscription canceled"
        );
        Ok(HandlerOutcome::Applied(format!(
            "Subscription {} canceled",
            subscription.id
        )))
    }
}
