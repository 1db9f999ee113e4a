//! Mock provisioning provider for testing.
//!
//! Keeps customers and subscriptions in memory and behaves like the real
//! API for create-or-fetch flows: references are deduplicated, suspend
//! and reactivate move the stored status.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::domain::sync::ProvisioningStatus;
use crate::ports::{
    CreateCustomerRequest, CreateSubscriptionRequest, ProvisionedCustomer,
    ProvisionedSubscription, ProvisioningError, ProvisioningProvider, UpdateCustomerRequest,
};

pub use crate::adapters::stripe::MethodCall;

/// Mock provisioning provider for testing.
#[derive(Clone, Default)]
pub struct MockProvisioningProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    customers: HashMap<String, ProvisionedCustomer>,
    organizations: HashMap<String, String>,
    subscriptions: HashMap<String, ProvisionedSubscription>,
    password_lengths: Vec<usize>,
    next_id: u32,
    method_errors: HashMap<String, (ProvisioningError, u32)>,
    call_log: Vec<MethodCall>,
    unhealthy: bool,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }
}

impl MockProvisioningProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_customer(&self, customer: ProvisionedCustomer) {
        self.state().customers.insert(customer.id.clone(), customer);
    }

    pub fn add_subscription(&self, subscription: ProvisionedSubscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn set_status(&self, subscription_id: &str, status: ProvisioningStatus) {
        if let Some(sub) = self.state().subscriptions.get_mut(subscription_id) {
            sub.status = status;
        }
    }

    /// Makes the next `times` calls to `method` fail with `error`.
    pub fn fail_times(&self, method: &str, error: ProvisioningError, times: u32) {
        self.state()
            .method_errors
            .insert(method.to_string(), (error, times));
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.state().unhealthy = unhealthy;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn subscription(&self, subscription_id: &str) -> Option<ProvisionedSubscription> {
        self.state().subscriptions.get(subscription_id).cloned()
    }

    pub fn subscriptions(&self) -> Vec<ProvisionedSubscription> {
        self.state().subscriptions.values().cloned().collect()
    }

    pub fn customers(&self) -> Vec<ProvisionedCustomer> {
        self.state().customers.values().cloned().collect()
    }

    pub fn organization_of(&self, customer_id: &str) -> Option<String> {
        self.state().organizations.get(customer_id).cloned()
    }

    pub fn password_lengths(&self) -> Vec<usize> {
        self.state().password_lengths.clone()
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn record(&self, method: &str, args: &[&str]) -> Result<(), ProvisioningError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        if let Some((error, remaining)) = state.method_errors.get_mut(method) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }
        Ok(())
    }

    fn set_subscription_status(
        &self,
        subscription_id: &str,
        status: ProvisioningStatus,
    ) -> Result<(), ProvisioningError> {
        let mut state = self.state();
        let sub = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| ProvisioningError::not_found("Subscription"))?;
        sub.status = status;
        Ok(())
    }
}

#[async_trait]
impl ProvisioningProvider for MockProvisioningProvider {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProvisionedCustomer>, ProvisioningError> {
        self.record("find_customer_by_email", &[email])?;
        Ok(self
            .state()
            .customers
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProvisionedCustomer, ProvisioningError> {
        self.record(
            "create_customer",
            &[request.email.as_str(), request.organization_name.as_str()],
        )?;
        let mut state = self.state();
        if state.customers.values().any(|c| c.email == request.email) {
            return Err(ProvisioningError::conflict("Email already registered"));
        }
        let id = state.next_id("prov_cus");
        let customer = ProvisionedCustomer {
            id: id.clone(),
            email: request.email,
            name: request.name,
        };
        state
            .password_lengths
            .push(request.password.expose_secret().len());
        state.organizations.insert(id.clone(), request.organization_name);
        state.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        customer_id: &str,
        request: UpdateCustomerRequest,
    ) -> Result<ProvisionedCustomer, ProvisioningError> {
        self.record("update_customer", &[customer_id])?;
        let mut state = self.state();
        if let Some(org) = request.organization {
            state.organizations.insert(customer_id.to_string(), org);
        }
        let customer = state
            .customers
            .get_mut(customer_id)
            .ok_or_else(|| ProvisioningError::not_found("Customer"))?;
        if let Some(email) = request.email {
            customer.email = email;
        }
        if let Some(name) = request.name {
            customer.name = Some(name);
        }
        Ok(customer.clone())
    }

    async fn find_subscription_by_reference(
        &self,
        customer_id: &str,
        reference: &str,
    ) -> Result<Option<ProvisionedSubscription>, ProvisioningError> {
        self.record("find_subscription_by_reference", &[customer_id, reference])?;
        Ok(self
            .state()
            .subscriptions
            .values()
            .find(|s| s.customer_id == customer_id && s.reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<ProvisionedSubscription, ProvisioningError> {
        self.record(
            "create_subscription",
            &[
                request.customer_id.as_str(),
                request.plan_id.as_str(),
                request.reference.as_str(),
            ],
        )?;
        let mut state = self.state();
        let existing = state
            .subscriptions
            .values()
            .find(|s| s.reference.as_deref() == Some(request.reference.as_str()))
            .cloned();
        if let Some(existing) = existing {
            return Ok(existing);
        }
        let id = state.next_id("prov_sub");
        let subscription = ProvisionedSubscription {
            id: id.clone(),
            customer_id: request.customer_id,
            plan_id: request.plan_id,
            status: ProvisioningStatus::Active,
            reference: Some(request.reference),
        };
        state.subscriptions.insert(id, subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProvisionedSubscription>, ProvisioningError> {
        self.record("get_subscription", &[subscription_id])?;
        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn suspend_subscription(&self, subscription_id: &str) -> Result<(), ProvisioningError> {
        self.record("suspend_subscription", &[subscription_id])?;
        self.set_subscription_status(subscription_id, ProvisioningStatus::Suspended)
    }

    async fn reactivate_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<(), ProvisioningError> {
        self.record("reactivate_subscription", &[subscription_id])?;
        self.set_subscription_status(subscription_id, ProvisioningStatus::Active)
    }

    async fn change_plan(
        &self,
        subscription_id: &str,
        plan_id: &str,
    ) -> Result<(), ProvisioningError> {
        self.record("change_plan", &[subscription_id, plan_id])?;
        let mut state = self.state();
        let sub = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| ProvisioningError::not_found("Subscription"))?;
        sub.plan_id = plan_id.to_string();
        Ok(())
    }

    async fn ping(&self) -> Result<(), ProvisioningError> {
        self.record("ping", &[])?;
        if self.state().unhealthy {
            return Err(ProvisioningError::unavailable("Provisioning API unhealthy"));
        }
        Ok(())
    }
}
