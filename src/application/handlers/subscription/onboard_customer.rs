//! OnboardCustomerHandler - Provisions a new customer on checkout completion.
//!
//! Onboarding is a saga of create-or-fetch steps. Progress is recorded as
//! each step completes; when a step fails with a retryable error the retry
//! resumes at that step instead of starting over. Nothing created in an
//! external system is rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use secrecy::SecretString;
use tokio::sync::Mutex;

use crate::application::handlers::webhook::{missing_projection, HandlerOutcome, WebhookEventHandler};
use crate::application::{with_retry, PlanMappingResolver, RequestContext, RetryPolicy};
use crate::domain::billing::{
    CanonicalEvent, CustomerProjection, EventKind, Projections, SubscriptionProjection,
};
use crate::domain::foundation::Email;
use crate::domain::sync::{Customer, Subscription, SyncError};
use crate::ports::{
    CreateCustomerRequest, CreateSubscriptionRequest, CustomerRepository, PaymentProvider,
    ProvisionedSubscription, ProvisioningProvider, SubscriptionRepository,
};

const PASSWORD_LENGTH: usize = 24;

/// Saga steps in execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum OnboardingStep {
    #[default]
    ResolveEmail,
    ProvisionCustomer,
    RecordCustomer,
    ResolvePlan,
    ProvisionSubscription,
    RecordSubscription,
    Complete,
}

impl OnboardingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStep::ResolveEmail => "resolve_email",
            OnboardingStep::ProvisionCustomer => "provision_customer",
            OnboardingStep::RecordCustomer => "record_customer",
            OnboardingStep::ResolvePlan => "resolve_plan",
            OnboardingStep::ProvisionSubscription => "provision_subscription",
            OnboardingStep::RecordSubscription => "record_subscription",
            OnboardingStep::Complete => "complete",
        }
    }
}

/// Results of completed steps.
#[derive(Debug, Default)]
struct OnboardingProgress {
    step: OnboardingStep,
    email: Option<Email>,
    name: Option<String>,
    provisioning_customer_id: Option<String>,
    customer: Option<Customer>,
    plan_id: Option<String>,
    provisioning_subscription: Option<ProvisionedSubscription>,
    subscription: Option<Subscription>,
}

impl OnboardingProgress {
    /// Progress for a customer already linked to the payments customer.
    fn for_existing(customer: Customer) -> Self {
        Self {
            step: OnboardingStep::ResolvePlan,
            email: Some(customer.email.clone()),
            name: customer.name.clone(),
            provisioning_customer_id: Some(customer.provisioning_customer_id.clone()),
            customer: Some(customer),
            ..Self::default()
        }
    }
}

fn recorded<T>(value: Option<T>, what: &str) -> Result<T, SyncError> {
    value.ok_or_else(|| SyncError::system(format!("Onboarding progress has no {}", what)))
}

/// 24 alphanumeric characters from the OS random source.
fn generate_password() -> SecretString {
    let password: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect();
    SecretString::new(password)
}

pub struct OnboardCustomerHandler {
    customers: Arc<dyn CustomerRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentProvider>,
    provisioning: Arc<dyn ProvisioningProvider>,
    resolver: PlanMappingResolver,
    retry: RetryPolicy,
}

impl OnboardCustomerHandler {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentProvider>,
        provisioning: Arc<dyn ProvisioningProvider>,
        resolver: PlanMappingResolver,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            customers,
            subscriptions,
            payments,
            provisioning,
            resolver,
            retry,
        }
    }

    /// Runs the remaining steps, recording each one as it completes.
    async fn resume(
        &self,
        ctx: &RequestContext,
        event: &CanonicalEvent,
        customer: &CustomerProjection,
        subscription: &SubscriptionProjection,
        progress: &Mutex<OnboardingProgress>,
    ) -> Result<(), SyncError> {
        let mut progress = progress.lock().await;

        while progress.step != OnboardingStep::Complete {
            let step = progress.step;
            tracing::debug!(
                request_id = %ctx.request_id,
                event_id = %event.event_id,
                step = step.as_str(),
                "Onboarding step"
            );

            match step {
                OnboardingStep::ResolveEmail => {
                    let (email, name) = self.resolve_email(customer).await?;
                    progress.email = Some(email);
                    progress.name = name;
                    progress.step = OnboardingStep::ProvisionCustomer;
                }
                OnboardingStep::ProvisionCustomer => {
                    let email = recorded(progress.email.clone(), "email")?;
                    let id = self.provision_customer(&email, progress.name.clone()).await?;
                    progress.provisioning_customer_id = Some(id);
                    progress.step = OnboardingStep::RecordCustomer;
                }
                OnboardingStep::RecordCustomer => {
                    let provisioning_id =
                        recorded(progress.provisioning_customer_id.clone(), "provisioning customer")?;
                    let email = recorded(progress.email.clone(), "email")?;
                    let record = self
                        .record_customer(
                            &provisioning_id,
                            &customer.external_customer_id,
                            email,
                            progress.name.clone(),
                        )
                        .await?;
                    progress.customer = Some(record);
                    progress.step = OnboardingStep::ResolvePlan;
                }
                OnboardingStep::ResolvePlan => {
                    let plan_id = self.resolve_plan(subscription).await?;
                    progress.plan_id = Some(plan_id);
                    progress.step = OnboardingStep::ProvisionSubscription;
                }
                OnboardingStep::ProvisionSubscription => {
                    let customer_id =
                        recorded(progress.provisioning_customer_id.clone(), "provisioning customer")?;
                    let plan_id = recorded(progress.plan_id.clone(), "plan")?;
                    let provisioned = self
                        .provision_subscription(customer_id, plan_id, event.idempotency_key())
                        .await?;
                    progress.provisioning_subscription = Some(provisioned);
                    progress.step = OnboardingStep::RecordSubscription;
                }
                OnboardingStep::RecordSubscription => {
                    let owner = recorded(progress.customer.as_ref(), "customer")?;
                    let provisioned =
                        recorded(progress.provisioning_subscription.as_ref(), "provisioning subscription")?;
                    let plan_id = recorded(progress.plan_id.as_deref(), "plan")?;
                    let record = self
                        .record_subscription(
                            owner,
                            provisioned,
                            &subscription.external_subscription_id,
                            plan_id,
                        )
                        .await?;
                    progress.subscription = Some(record);
                    progress.step = OnboardingStep::Complete;
                }
                OnboardingStep::Complete => {}
            }
        }

        Ok(())
    }

    async fn resolve_email(
        &self,
        projection: &CustomerProjection,
    ) -> Result<(Email, Option<String>), SyncError> {
        if let Some(email) = projection.email.as_deref() {
            return Ok((Email::new(email)?, projection.name.clone()));
        }

        let remote = self
            .payments
            .get_customer(&projection.external_customer_id)
            .await?
            .ok_or_else(|| {
                SyncError::business_logic(format!(
                    "Payments customer {} not found",
                    projection.external_customer_id
                ))
            })?;
        let email = remote.email.as_deref().ok_or_else(|| {
            SyncError::business_logic(format!(
                "Payments customer {} has no email",
                projection.external_customer_id
            ))
        })?;
        Ok((Email::new(email)?, projection.name.clone().or(remote.name)))
    }

    async fn provision_customer(
        &self,
        email: &Email,
        name: Option<String>,
    ) -> Result<String, SyncError> {
        if let Some(existing) = self.provisioning.find_customer_by_email(email.as_str()).await? {
            return Ok(existing.id);
        }

        let organization_name = name.clone().unwrap_or_else(|| email.as_str().to_string());
        let created = self
            .provisioning
            .create_customer(CreateCustomerRequest {
                email: email.as_str().to_string(),
                name,
                password: generate_password(),
                organization_name,
            })
            .await?;
        Ok(created.id)
    }

    async fn record_customer(
        &self,
        provisioning_customer_id: &str,
        payments_customer_id: &str,
        email: Email,
        name: Option<String>,
    ) -> Result<Customer, SyncError> {
        if let Some(mut existing) = self
            .customers
            .find_by_provisioning_id(provisioning_customer_id)
            .await?
        {
            if existing.payments_customer_id.is_none() {
                existing.link_payments_customer(payments_customer_id);
                self.customers.update(&existing).await?;
            }
            return Ok(existing);
        }

        let customer = Customer::new(
            provisioning_customer_id,
            Some(payments_customer_id.to_string()),
            email,
            name,
        );
        self.customers.create(&customer).await?;
        Ok(customer)
    }

    async fn resolve_plan(&self, projection: &SubscriptionProjection) -> Result<String, SyncError> {
        let price_id = match projection.price_id.clone() {
            Some(price_id) => price_id,
            None => self
                .payments
                .get_subscription(&projection.external_subscription_id)
                .await?
                .and_then(|s| s.price_id)
                .ok_or_else(|| {
                    SyncError::business_logic(format!(
                        "No price for payments subscription {}",
                        projection.external_subscription_id
                    ))
                })?,
        };
        self.resolver
            .resolve(self.payments.provider_name(), &price_id)
            .await
    }

    async fn provision_subscription(
        &self,
        customer_id: String,
        plan_id: String,
        reference: String,
    ) -> Result<ProvisionedSubscription, SyncError> {
        if let Some(existing) = self
            .provisioning
            .find_subscription_by_reference(&customer_id, &reference)
            .await?
        {
            return Ok(existing);
        }

        Ok(self
            .provisioning
            .create_subscription(CreateSubscriptionRequest {
                customer_id,
                plan_id,
                reference,
            })
            .await?)
    }

    async fn record_subscription(
        &self,
        owner: &Customer,
        provisioned: &ProvisionedSubscription,
        payments_subscription_id: &str,
        plan_id: &str,
    ) -> Result<Subscription, SyncError> {
        if let Some(existing) = self
            .subscriptions
            .find_by_provisioning_id(&provisioned.id)
            .await?
        {
            return Ok(existing);
        }

        let subscription = Subscription::new(
            owner.id,
            provisioned.id.clone(),
            Some(payments_subscription_id.to_string()),
            plan_id,
        );
        self.subscriptions.create(&subscription).await?;
        Ok(subscription)
    }
}

#[async_trait]
impl WebhookEventHandler for OnboardCustomerHandler {
    fn handles(&self) -> Vec<EventKind> {
        vec![EventKind::CheckoutSessionCompleted]
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        event: &CanonicalEvent,
        projections: &Projections,
    ) -> Result<HandlerOutcome, SyncError> {
        let customer = projections
            .customer
            .as_ref()
            .ok_or_else(|| missing_projection(event, "customer"))?;
        let subscription = projections
            .subscription
            .as_ref()
            .ok_or_else(|| missing_projection(event, "subscription"))?;

        let subscriptions = &self.subscriptions;
        let external_subscription_id = subscription.external_subscription_id.as_str();
        if with_retry(&self.retry, "find_subscription", move || {
            subscriptions.find_by_payments_id(external_subscription_id)
        })
        .await?
        .is_some()
        {
            return Ok(HandlerOutcome::Skipped(format!(
                "Subscription {} already onboarded",
                external_subscription_id
            )));
        }

        let customers = &self.customers;
        let external_customer_id = customer.external_customer_id.as_str();
        let linked = with_retry(&self.retry, "find_customer", move || {
            customers.find_by_payments_id(external_customer_id)
        })
        .await?;
        let progress = Mutex::new(match linked {
            Some(existing) => {
                tracing::info!(
                    request_id = %ctx.request_id,
                    customer_id = %existing.id,
                    "Customer already linked, skipping customer provisioning"
                );
                OnboardingProgress::for_existing(existing)
            }
            None => OnboardingProgress::default(),
        });

        let progress_ref = &progress;
        with_retry(&self.retry, "onboard_customer", move || {
            self.resume(ctx, event, customer, subscription, progress_ref)
        })
        .await
        .map_err(|err| {
            let step = progress
                .try_lock()
                .map(|p| p.step.as_str())
                .unwrap_or("unknown");
            err.with_context("onboarding_step", step)
        })?;

        let progress = progress.into_inner();
        let customer = recorded(progress.customer, "customer")?;
        let subscription = recorded(progress.subscription, "subscription")?;
        tracing::info!(
            request_id = %ctx.request_id,
            customer_id = %customer.id,
            subscription_id = %subscription.id,
            plan_id = %subscription.plan_id,
            "Customer onboarded"
        );
        Ok(HandlerOutcome::Applied(format!(
            "Onboarded customer {} with subscription {}",
            customer.id, subscription.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCustomerRepository, InMemoryPlanMappingRepository, InMemorySubscriptionRepository,
    };
    use crate::adapters::provisioning::MockProvisioningProvider;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{extract, CanonicalEventBuilder};
    use crate::domain::sync::{ErrorCategory, PlanMapping, SubscriptionStatus};
    use crate::ports::{PaymentsCustomer, ProvisioningError};
    use secrecy::ExposeSecret;
    use serde_json::json;

    struct Fixture {
        handler: OnboardCustomerHandler,
        customers: Arc<InMemoryCustomerRepository>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        payments: Arc<MockPaymentProvider>,
        provisioning: Arc<MockProvisioningProvider>,
    }

    fn fixture() -> Fixture {
        let customers = Arc::new(InMemoryCustomerRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let provisioning = Arc::new(MockProvisioningProvider::new());
        let mappings = Arc::new(InMemoryPlanMappingRepository::with_mappings(vec![
            PlanMapping::new("stripe", "price_pro_monthly", "pro-hosting-plan"),
        ]));
        let handler = OnboardCustomerHandler::new(
            customers.clone(),
            subscriptions.clone(),
            payments.clone(),
            provisioning.clone(),
            PlanMappingResolver::new(mappings),
            RetryPolicy::immediate(3),
        );
        Fixture {
            handler,
            customers,
            subscriptions,
            payments,
            provisioning,
        }
    }

    fn checkout(customer_details: serde_json::Value) -> CanonicalEvent {
        CanonicalEventBuilder::new("checkout.session.completed")
            .event_id("evt_checkout_1")
            .payload(json!({
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "customer_details": customer_details,
                "metadata": { "price_id": "price_pro_monthly" }
            }))
            .build()
    }

    async fn run(f: &Fixture, event: &CanonicalEvent) -> Result<HandlerOutcome, SyncError> {
        let projections = extract(event).unwrap();
        f.handler
            .handle(&RequestContext::new("test"), event, &projections)
            .await
    }

    #[test]
    fn generated_password_is_24_alphanumeric_chars() {
        let password = generate_password();
        let exposed = password.expose_secret();
        assert_eq!(exposed.len(), 24);
        assert!(exposed.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn steps_are_ordered() {
        assert!(OnboardingStep::ResolveEmail < OnboardingStep::ProvisionCustomer);
        assert!(OnboardingStep::RecordSubscription < OnboardingStep::Complete);
    }

    #[tokio::test]
    async fn new_customer_gets_customer_and_active_subscription() {
        let f = fixture();
        let event = checkout(json!({ "email": "jane@example.com", "name": "Jane Doe" }));

        let outcome = run(&f, &event).await.unwrap();
        assert!(!outcome.is_skipped());

        let customers = f.customers.all().await;
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].email.as_str(), "jane@example.com");
        assert_eq!(customers[0].payments_customer_id.as_deref(), Some("cus_1"));

        let subscriptions = f.subscriptions.all().await;
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].plan_id, "pro-hosting-plan");
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Active);
        assert_eq!(subscriptions[0].customer_id, customers[0].id);

        let provisioned = f.provisioning.subscriptions();
        assert_eq!(provisioned[0].reference.as_deref(), Some("stripe:evt_checkout_1"));
        assert_eq!(
            f.provisioning.organization_of(&customers[0].provisioning_customer_id).as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(f.provisioning.password_lengths(), vec![24]);
    }

    #[tokio::test]
    async fn organization_falls_back_to_email() {
        let f = fixture();
        run(&f, &checkout(json!({ "email": "solo@example.com" }))).await.unwrap();

        let customer = &f.provisioning.customers()[0];
        assert_eq!(
            f.provisioning.organization_of(&customer.id).as_deref(),
            Some("solo@example.com")
        );
    }

    #[tokio::test]
    async fn missing_email_is_looked_up_from_payments() {
        let f = fixture();
        f.payments.add_customer(PaymentsCustomer {
            id: "cus_1".into(),
            email: Some("lookup@example.com".into()),
            name: Some("Looked Up".into()),
        });
        let event = CanonicalEventBuilder::new("checkout.session.completed")
            .payload(json!({
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": { "price_id": "price_pro_monthly" }
            }))
            .build();

        run(&f, &event).await.unwrap();

        assert_eq!(f.payments.call_count("get_customer"), 1);
        assert_eq!(f.customers.all().await[0].email.as_str(), "lookup@example.com");
    }

    #[tokio::test]
    async fn retry_resumes_from_failed_step() {
        let f = fixture();
        f.provisioning.fail_times(
            "create_subscription",
            ProvisioningError::unavailable("503"),
            1,
        );

        run(&f, &checkout(json!({ "email": "jane@example.com" }))).await.unwrap();

        assert_eq!(f.provisioning.call_count("create_customer"), 1);
        assert_eq!(f.provisioning.call_count("create_subscription"), 2);
        assert_eq!(f.customers.count().await, 1);
        assert_eq!(f.subscriptions.count().await, 1);
    }

    #[tokio::test]
    async fn linked_customer_skips_customer_steps() {
        let f = fixture();
        run(&f, &checkout(json!({ "email": "jane@example.com" }))).await.unwrap();

        let second = CanonicalEventBuilder::new("checkout.session.completed")
            .event_id("evt_checkout_2")
            .payload(json!({
                "customer": "cus_1",
                "subscription": "sub_2",
                "customer_details": { "email": "jane@example.com" },
                "metadata": { "price_id": "price_pro_monthly" }
            }))
            .build();
        run(&f, &second).await.unwrap();

        assert_eq!(f.provisioning.call_count("find_customer_by_email"), 1);
        assert_eq!(f.customers.count().await, 1);
        assert_eq!(f.subscriptions.count().await, 2);
    }

    #[tokio::test]
    async fn already_onboarded_subscription_is_skipped() {
        let f = fixture();
        let event = checkout(json!({ "email": "jane@example.com" }));
        run(&f, &event).await.unwrap();

        let outcome = run(&f, &event).await.unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(f.provisioning.call_count("create_subscription"), 1);
    }

    #[tokio::test]
    async fn unmapped_price_fails_after_customer_is_recorded() {
        let f = fixture();
        let event = CanonicalEventBuilder::new("checkout.session.completed")
            .payload(json!({
                "customer": "cus_1",
                "subscription": "sub_1",
                "customer_email": "jane@example.com",
                "metadata": { "price_id": "price_unknown" }
            }))
            .build();

        let err = run(&f, &event).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::BusinessLogic);
        assert_eq!(
            err.context.get("onboarding_step").map(String::as_str),
            Some("resolve_plan")
        );
        assert_eq!(f.customers.count().await, 1);
        assert_eq!(f.subscriptions.count().await, 0);
    }
}
