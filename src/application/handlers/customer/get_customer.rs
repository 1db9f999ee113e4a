//! GetCustomerHandler - Admin lookup of a customer.

use std::sync::Arc;

use crate::application::{with_retry, RetryPolicy};
use crate::domain::foundation::{CustomerId, Email};
use crate::domain::sync::{Customer, SyncError};
use crate::ports::CustomerRepository;

/// How to find a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerLookup {
    Id(CustomerId),
    Email(Email),
    /// Payments-system customer id (`cus_...`).
    PaymentsId(String),
}

impl CustomerLookup {
    /// Internal UUIDs select by id; anything else is a payments customer id.
    pub fn from_customer_id(value: &str) -> Self {
        match value.parse::<CustomerId>() {
            Ok(id) => CustomerLookup::Id(id),
            Err(_) => CustomerLookup::PaymentsId(value.to_string()),
        }
    }

    pub fn from_email(value: &str) -> Result<Self, SyncError> {
        Ok(CustomerLookup::Email(Email::new(value)?))
    }
}

#[derive(Clone)]
pub struct GetCustomerHandler {
    customers: Arc<dyn CustomerRepository>,
    retry: RetryPolicy,
}

impl GetCustomerHandler {
    pub fn new(customers: Arc<dyn CustomerRepository>, retry: RetryPolicy) -> Self {
        Self { customers, retry }
    }

    /// Soft-deleted customers are not returned.
    pub async fn handle(&self, lookup: &CustomerLookup) -> Result<Option<Customer>, SyncError> {
        let customers = &self.customers;
        match lookup {
            CustomerLookup::Id(id) => {
                with_retry(&self.retry, "find_customer", move || customers.find_by_id(id)).await
            }
            CustomerLookup::Email(email) => {
                with_retry(&self.retry, "find_customer", move || {
                    customers.find_by_email(email)
                })
                .await
            }
            CustomerLookup::PaymentsId(payments_id) => {
                with_retry(&self.retry, "find_customer", move || {
                    customers.find_by_payments_id(payments_id)
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCustomerRepository;
    use crate::domain::foundation::Timestamp;
    use crate::domain::sync::ErrorCategory;

    async fn setup() -> (GetCustomerHandler, Arc<InMemoryCustomerRepository>, Customer) {
        let repo = Arc::new(InMemoryCustomerRepository::new());
        let customer = Customer::new(
            "prov_cus_1",
            Some("cus_1".into()),
            Email::new("jane@example.com").unwrap(),
            Some("Jane".into()),
        );
        repo.create(&customer).await.unwrap();
        (
            GetCustomerHandler::new(repo.clone(), RetryPolicy::immediate(1)),
            repo,
            customer,
        )
    }

    #[tokio::test]
    async fn finds_by_email_case_insensitively() {
        let (handler, _, customer) = setup().await;
        let found = handler
            .handle(&CustomerLookup::from_email("JANE@example.com").unwrap())
            .await
            .unwrap();
        assert_eq!(found.map(|c| c.id), Some(customer.id));
    }

    #[tokio::test]
    async fn finds_by_payments_or_internal_id() {
        let (handler, _, customer) = setup().await;
        let by_payments = handler
            .handle(&CustomerLookup::from_customer_id("cus_1"))
            .await
            .unwrap();
        let by_id = handler
            .handle(&CustomerLookup::from_customer_id(&customer.id.to_string()))
            .await
            .unwrap();
        assert_eq!(by_payments.map(|c| c.id), Some(customer.id));
        assert_eq!(by_id.map(|c| c.id), Some(customer.id));
    }

    #[tokio::test]
    async fn soft_deleted_customer_is_hidden() {
        let (handler, repo, customer) = setup().await;
        repo.soft_delete(&customer.id, Timestamp::now()).await.unwrap();

        let found = handler
            .handle(&CustomerLookup::PaymentsId("cus_1".into()))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn malformed_email_is_validation_error() {
        let err = CustomerLookup::from_email("not-an-email").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Validation);
    }
}
