//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured customers and subscriptions
//! - Error injection per method, for a number of calls
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::sync::STRIPE_PROVIDER;
use crate::ports::{PaymentError, PaymentProvider, PaymentsCustomer, PaymentsSubscription};

/// Mock payment provider for testing.
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    customers: HashMap<String, PaymentsCustomer>,
    subscriptions: HashMap<String, PaymentsSubscription>,
    /// Errors by method name with the number of calls left to fail.
    method_errors: HashMap<String, (PaymentError, u32)>,
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_customer(&self, customer: PaymentsCustomer) {
        self.state().customers.insert(customer.id.clone(), customer);
    }

    pub fn add_subscription(&self, subscription: PaymentsSubscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Changes the status of a configured subscription.
    pub fn set_subscription_status(&self, subscription_id: &str, status: &str) {
        if let Some(sub) = self.state().subscriptions.get_mut(subscription_id) {
            sub.status = status.to_string();
        }
    }

    /// Makes the next `times` calls to `method` fail with `error`.
    pub fn fail_times(&self, method: &str, error: PaymentError, times: u32) {
        self.state()
            .method_errors
            .insert(method.to_string(), (error, times));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

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

    fn record(&self, method: &str, args: &[&str]) -> Result<(), PaymentError> {
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
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn provider_name(&self) -> &'static str {
        STRIPE_PROVIDER
    }

    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<PaymentsCustomer>, PaymentError> {
        self.record("get_customer", &[customer_id])?;
        Ok(self.state().customers.get(customer_id).cloned())
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<PaymentsSubscription>, PaymentError> {
        self.record("get_subscription", &[subscription_id])?;
        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }
}
