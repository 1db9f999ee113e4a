//! DeleteCustomerHandler - Soft-deletes a customer.

use std::sync::Arc;

use crate::application::{with_retry, RequestContext, RetryPolicy};
use crate::domain::foundation::{CustomerId, Timestamp};
use crate::domain::sync::SyncError;
use crate::ports::CustomerRepository;

#[derive(Clone)]
pub struct DeleteCustomerHandler {
    customers: Arc<dyn CustomerRepository>,
    retry: RetryPolicy,
}

impl DeleteCustomerHandler {
    pub fn new(customers: Arc<dyn CustomerRepository>, retry: RetryPolicy) -> Self {
        Self { customers, retry }
    }

    /// Returns `false` when the customer does not exist or is already deleted.
    pub async fn handle(&self, ctx: &RequestContext, customer_id: CustomerId) -> Result<bool, SyncError> {
        let customers = &self.customers;
        let id = &customer_id;
        let now = Timestamp::now();
        let deleted = with_retry(&self.retry, "soft_delete_customer", move || {
            customers.soft_delete(id, now)
        })
        .await?;

        if deleted {
            tracing::info!(
                request_id = %ctx.request_id,
                customer_id = %customer_id,
                "Customer soft-deleted"
            );
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCustomerRepository;
    use crate::domain::foundation::Email;
    use crate::domain::sync::Customer;

    #[tokio::test]
    async fn soft_delete_hides_and_is_not_repeated() {
        let repo = Arc::new(InMemoryCustomerRepository::new());
        let customer = Customer::new("prov_cus_1", None, Email::new("a@example.com").unwrap(), None);
        repo.create(&customer).await.unwrap();
        let handler = DeleteCustomerHandler::new(repo.clone(), RetryPolicy::immediate(1));
        let ctx = RequestContext::new("admin");

        assert!(handler.handle(&ctx, customer.id).await.unwrap());
        assert!(!handler.handle(&ctx, customer.id).await.unwrap());
        assert!(repo.find_by_id(&customer.id).await.unwrap().is_none());
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn unknown_customer_returns_false() {
        let handler = DeleteCustomerHandler::new(
            Arc::new(InMemoryCustomerRepository::new()),
            RetryPolicy::immediate(1),
        );
        assert!(!handler
            .handle(&RequestContext::new("admin"), CustomerId::new())
            .await
            .unwrap());
    }
}
