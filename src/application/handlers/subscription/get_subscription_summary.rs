//! GetSubscriptionSummaryHandler - Counts subscriptions by status.

use std::sync::Arc;

use crate::application::{with_retry, RetryPolicy};
use crate::domain::sync::SyncError;
use crate::ports::{SubscriptionRepository, SubscriptionSummary};

#[derive(Clone)]
pub struct GetSubscriptionSummaryHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    retry: RetryPolicy,
}

impl GetSubscriptionSummaryHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, retry: RetryPolicy) -> Self {
        Self {
            subscriptions,
            retry,
        }
    }

    pub async fn handle(&self) -> Result<SubscriptionSummary, SyncError> {
        let subscriptions = &self.subscriptions;
        with_retry(&self.retry, "subscription_summary", move || subscriptions.summary()).await
    }
}
