//! Customer repository port.
//!
//! Lookups never return soft-deleted customers.

use async_trait::async_trait;

use crate::domain::foundation::{CustomerId, DomainError, Email, Timestamp};
use crate::domain::sync::Customer;

/// Repository port for Customer persistence.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Insert a new customer.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the email or either external id is already taken
    /// - `DatabaseError` on persistence failure
    async fn create(&self, customer: &Customer) -> Result<(), DomainError>;

    /// Update an existing customer.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the customer doesn't exist
    async fn update(&self, customer: &Customer) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, DomainError>;

    async fn find_by_provisioning_id(
        &self,
        provisioning_customer_id: &str,
    ) -> Result<Option<Customer>, DomainError>;

    async fn find_by_payments_id(
        &self,
        payments_customer_id: &str,
    ) -> Result<Option<Customer>, DomainError>;

    /// Mark a customer deleted. Returns false if no live customer matched.
    async fn soft_delete(&self, id: &CustomerId, at: Timestamp) -> Result<bool, DomainError>;
}
