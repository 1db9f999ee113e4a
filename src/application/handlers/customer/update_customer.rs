//! UpdateCustomerHandler - Admin profile change, provisioning first.

use std::sync::Arc;

use crate::application::{with_retry, RequestContext, RetryPolicy};
use crate::domain::foundation::{CustomerId, Email};
use crate::domain::sync::{Customer, SyncError};
use crate::ports::{CustomerRepository, ProvisioningProvider, UpdateCustomerRequest};

/// Command to update a customer's profile.
#[derive(Debug, Clone, Default)]
pub struct UpdateCustomerCommand {
    pub email: Option<String>,
    pub name: Option<String>,
    /// Only stored in the provisioning system.
    pub organization: Option<String>,
}

#[derive(Clone)]
pub struct UpdateCustomerHandler {
    customers: Arc<dyn CustomerRepository>,
    provisioning: Arc<dyn ProvisioningProvider>,
    retry: RetryPolicy,
}

impl UpdateCustomerHandler {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        provisioning: Arc<dyn ProvisioningProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            customers,
            provisioning,
            retry,
        }
    }

    /// Returns the updated customer, or `None` if no such customer exists.
    pub async fn handle(
        &self,
        ctx: &RequestContext,
        customer_id: CustomerId,
        cmd: UpdateCustomerCommand,
    ) -> Result<Option<Customer>, SyncError> {
        let email = cmd.email.as_deref().map(Email::new).transpose()?;
        let request = UpdateCustomerRequest {
            email: email.as_ref().map(|e| e.as_str().to_string()),
            name: cmd.name.clone(),
            organization: cmd.organization,
        };
        if request.is_empty() {
            return Err(SyncError::validation("No profile fields to update"));
        }

        let customers = &self.customers;
        let id = &customer_id;
        let Some(mut customer) =
            with_retry(&self.retry, "find_customer", move || customers.find_by_id(id)).await?
        else {
            return Ok(None);
        };

        let provisioning = &self.provisioning;
        let provisioning_id = customer.provisioning_customer_id.as_str();
        let request_ref = &request;
        with_retry(&self.retry, "provisioning_update_customer", move || {
            provisioning.update_customer(provisioning_id, request_ref.clone())
        })
        .await?;

        if email.is_some() || cmd.name.is_some() {
            customer.update_profile(email, cmd.name);
            let customer_ref = &customer;
            with_retry(&self.retry, "update_customer", move || {
                customers.update(customer_ref)
            })
            .await?;
        }

        tracing::info!(
            request_id = %ctx.request_id,
            customer_id = %customer.id,
            "Customer profile updated"
        );
        Ok(Some(customer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCustomerRepository;
    use crate::adapters::provisioning::MockProvisioningProvider;
    use crate::domain::sync::ErrorCategory;
    use crate::ports::ProvisionedCustomer;

    async fn setup() -> (
        UpdateCustomerHandler,
        Arc<InMemoryCustomerRepository>,
        Arc<MockProvisioningProvider>,
        Customer,
    ) {
        let customers = Arc::new(InMemoryCustomerRepository::new());
        let provisioning = Arc::new(MockProvisioningProvider::new());
        provisioning.add_customer(ProvisionedCustomer {
            id: "prov_cus_1".into(),
            email: "jane@example.com".into(),
            name: Some("Jane".into()),
        });
        let customer = Customer::new(
            "prov_cus_1",
            Some("cus_1".into()),
            Email::new("jane@example.com").unwrap(),
            Some("Jane".into()),
        );
        customers.create(&customer).await.unwrap();
        let handler =
            UpdateCustomerHandler::new(customers.clone(), provisioning.clone(), RetryPolicy::immediate(1));
        (handler, customers, provisioning, customer)
    }

    #[tokio::test]
    async fn updates_provisioning_then_mirrors_internally() {
        let (handler, customers, provisioning, customer) = setup().await;

        let updated = handler
            .handle(
                &RequestContext::new("admin"),
                customer.id,
                UpdateCustomerCommand {
                    email: Some("Jane.New@Example.com".into()),
                    name: Some("Jane New".into()),
                    organization: Some("Jane Co".into()),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.email.as_str(), "jane.new@example.com");
        assert_eq!(provisioning.customers()[0].email, "jane.new@example.com");
        assert_eq!(provisioning.organization_of("prov_cus_1").as_deref(), Some("Jane Co"));
        let stored = customers.find_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Jane New"));
    }

    #[tokio::test]
    async fn provisioning_failure_leaves_internal_untouched() {
        let (handler, customers, provisioning, customer) = setup().await;
        provisioning.fail_times(
            "update_customer",
            crate::ports::ProvisioningError::unauthorized("bad token"),
            1,
        );

        let err = handler
            .handle(
                &RequestContext::new("admin"),
                customer.id,
                UpdateCustomerCommand {
                    name: Some("Changed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(err.is_critical());
        let stored = customers.find_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn unknown_customer_is_none() {
        let (handler, _, provisioning, _) = setup().await;
        let result = handler
            .handle(
                &RequestContext::new("admin"),
                CustomerId::new(),
                UpdateCustomerCommand {
                    name: Some("X".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(provisioning.call_count("update_customer"), 0);
    }

    #[tokio::test]
    async fn invalid_or_empty_commands_are_rejected() {
        let (handler, _, _, customer) = setup().await;
        let ctx = RequestContext::new("admin");

        let empty = handler
            .handle(&ctx, customer.id, UpdateCustomerCommand::default())
            .await
            .unwrap_err();
        let bad_email = handler
            .handle(
                &ctx,
                customer.id,
                UpdateCustomerCommand {
                    email: Some("nope".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(empty.category, ErrorCategory::Validation);
        assert_eq!(bad_email.category, ErrorCategory::Validation);
    }
}
