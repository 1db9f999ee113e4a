//! Shared state for HTTP handlers.

use std::sync::Arc;

use secrecy::SecretString;

use super::dto::ConfigPresence;
use crate::application::handlers::customer::{
    DeleteCustomerHandler, GetCustomerHandler, UpdateCustomerHandler,
};
use crate::application::handlers::subscription::{
    ChangePlanHandler, DeleteSubscriptionHandler, GetSubscriptionSummaryHandler,
    OnboardCustomerHandler, SyncSubscriptionsHandler, UpdateSubscriptionHandler,
    DEFAULT_SYNC_CONCURRENCY,
};
use crate::application::handlers::webhook::{EventDispatcher, ProcessWebhookHandler};
use crate::application::{ErrorReporter, PlanMappingResolver, RequestContext, RetryPolicy};
use crate::domain::billing::WebhookVerifier;
use crate::domain::sync::SyncError;
use crate::ports::{
    CustomerRepository, PaymentProvider, PlanMappingRepository, ProvisioningProvider,
    SubscriptionRepository, WebhookLogRepository,
};

/// Application state holding every collaborator the handlers need.
///
/// Handlers are built per request from these ports; nothing is cached
/// between invocations.
#[derive(Clone)]
pub struct AppState {
    pub customers: Arc<dyn CustomerRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub plan_mappings: Arc<dyn PlanMappingRepository>,
    pub webhook_logs: Arc<dyn WebhookLogRepository>,
    pub payments: Arc<dyn PaymentProvider>,
    pub provisioning: Arc<dyn ProvisioningProvider>,
    pub verifier: Arc<WebhookVerifier>,
    pub reporter: ErrorReporter,
    pub retry: RetryPolicy,
    pub sync_concurrency: usize,
    pub admin_secret: Arc<SecretString>,
    pub config_presence: ConfigPresence,
}

/// Ports and secrets needed to assemble an [`AppState`].
pub struct AppStateParts {
    pub customers: Arc<dyn CustomerRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub plan_mappings: Arc<dyn PlanMappingRepository>,
    pub webhook_logs: Arc<dyn WebhookLogRepository>,
    pub payments: Arc<dyn PaymentProvider>,
    pub provisioning: Arc<dyn ProvisioningProvider>,
    pub verifier: WebhookVerifier,
    pub reporter: ErrorReporter,
    pub admin_secret: SecretString,
}

impl AppState {
    pub fn new(parts: AppStateParts) -> Self {
        Self {
            customers: parts.customers,
            subscriptions: parts.subscriptions,
            plan_mappings: parts.plan_mappings,
            webhook_logs: parts.webhook_logs,
            payments: parts.payments,
            provisioning: parts.provisioning,
            verifier: Arc::new(parts.verifier),
            reporter: parts.reporter,
            retry: RetryPolicy::default(),
            sync_concurrency: DEFAULT_SYNC_CONCURRENCY,
            admin_secret: Arc::new(parts.admin_secret),
            config_presence: ConfigPresence::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sync_concurrency(mut self, concurrency: usize) -> Self {
        self.sync_concurrency = concurrency;
        self
    }

    pub fn with_config_presence(mut self, presence: ConfigPresence) -> Self {
        self.config_presence = presence;
        self
    }

    /// Reports a failed result before handing it back.
    pub async fn report<T>(
        &self,
        ctx: &RequestContext,
        result: Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        if let Err(err) = &result {
            self.reporter.report(ctx, err).await;
        }
        result
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Handler factories
    // ════════════════════════════════════════════════════════════════════════════

    pub fn process_webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(
            self.verifier.clone(),
            self.webhook_logs.clone(),
            self.dispatcher(),
            self.reporter.clone(),
            self.retry.clone(),
        )
    }

    /// Routes every supported event kind to its reconciliation handler.
    pub fn dispatcher(&self) -> EventDispatcher {
        let resolver = PlanMappingResolver::new(self.plan_mappings.clone());
        let change_plan = ChangePlanHandler::new(
            self.subscriptions.clone(),
            self.provisioning.clone(),
            resolver.clone(),
            self.payments.provider_name(),
            self.retry.clone(),
        );

        EventDispatcher::new()
            .register(Arc::new(OnboardCustomerHandler::new(
                self.customers.clone(),
                self.subscriptions.clone(),
                self.payments.clone(),
                self.provisioning.clone(),
                resolver,
                self.retry.clone(),
            )))
            .register(Arc::new(UpdateSubscriptionHandler::new(
                self.subscriptions.clone(),
                self.provisioning.clone(),
                change_plan,
                self.retry.clone(),
            )))
            .register(Arc::new(DeleteSubscriptionHandler::new(
                self.subscriptions.clone(),
                self.provisioning.clone(),
                self.retry.clone(),
            )))
            .register(Arc::new(self.sync_handler()))
    }

    pub fn sync_handler(&self) -> SyncSubscriptionsHandler {
        SyncSubscriptionsHandler::new(
            self.subscriptions.clone(),
            self.payments.clone(),
            self.provisioning.clone(),
            self.retry.clone(),
        )
        .with_concurrency(self.sync_concurrency)
    }

    pub fn summary_handler(&self) -> GetSubscriptionSummaryHandler {
        GetSubscriptionSummaryHandler::new(self.subscriptions.clone(), self.retry.clone())
    }

    pub fn get_customer_handler(&self) -> GetCustomerHandler {
        GetCustomerHandler::new(self.customers.clone(), self.retry.clone())
    }

    pub fn update_customer_handler(&self) -> UpdateCustomerHandler {
        UpdateCustomerHandler::new(
            self.customers.clone(),
            self.provisioning.clone(),
            self.retry.clone(),
        )
    }

    pub fn delete_customer_handler(&self) -> DeleteCustomerHandler {
        DeleteCustomerHandler::new(self.customers.clone(), self.retry.clone())
    }
}
