//! In-memory customer repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{CustomerId, DomainError, Email, ErrorCode, Timestamp};
use crate::domain::sync::Customer;
use crate::ports::CustomerRepository;

/// In-memory storage for customers, enforcing the same unique keys as the
/// `customers` table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerRepository {
    customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows, including soft-deleted ones.
    pub async fn all(&self) -> Vec<Customer> {
        self.customers.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.customers.read().await.len()
    }
}

fn conflicts(existing: &Customer, candidate: &Customer) -> Option<&'static str> {
    if existing.id == candidate.id {
        return None;
    }
    if existing.email == candidate.email {
        return Some("email");
    }
    if existing.provisioning_customer_id == candidate.provisioning_customer_id {
        return Some("provisioning_customer_id");
    }
    match (&existing.payments_customer_id, &candidate.payments_customer_id) {
        (Some(a), Some(b)) if a == b => Some("payments_customer_id"),
        _ => None,
    }
}

fn check_unique(map: &HashMap<CustomerId, Customer>, candidate: &Customer) -> Result<(), DomainError> {
    match map.values().find_map(|c| conflicts(c, candidate)) {
        Some(field) => Err(DomainError::new(
            ErrorCode::Conflict,
            format!("Customer with this {} already exists", field),
        )
        .with_detail("field", field)),
        None => Ok(()),
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn create(&self, customer: &Customer) -> Result<(), DomainError> {
        let mut map = self.customers.write().await;
        if map.contains_key(&customer.id) {
            return Err(DomainError::new(ErrorCode::Conflict, "Customer already exists"));
        }
        check_unique(&map, customer)?;
        map.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update(&self, customer: &Customer) -> Result<(), DomainError> {
        let mut map = self.customers.write().await;
        if !map.contains_key(&customer.id) {
            return Err(DomainError::not_found("Customer", customer.id));
        }
        check_unique(&map, customer)?;
        map.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError> {
        let map = self.customers.read().await;
        Ok(map.get(id).filter(|c| !c.is_deleted()).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, DomainError> {
        let map = self.customers.read().await;
        Ok(map
            .values()
            .find(|c| !c.is_deleted() && &c.email == email)
            .cloned())
    }

    async fn find_by_provisioning_id(
        &self,
        provisioning_customer_id: &str,
    ) -> Result<Option<Customer>, DomainError> {
        let map = self.customers.read().await;
        Ok(map
            .values()
            .find(|c| !c.is_deleted() && c.provisioning_customer_id == provisioning_customer_id)
            .cloned())
    }

    async fn find_by_payments_id(
        &self,
        payments_customer_id: &str,
    ) -> Result<Option<Customer>, DomainError> {
        let map = self.customers.read().await;
        Ok(map
            .values()
            .find(|c| {
                !c.is_deleted() && c.payments_customer_id.as_deref() == Some(payments_customer_id)
            })
            .cloned())
    }

    async fn soft_delete(&self, id: &CustomerId, at: Timestamp) -> Result<bool, DomainError> {
        let mut map = self.customers.write().await;
        match map.get_mut(id) {
            Some(customer) if !customer.is_deleted() => {
                customer.soft_delete(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(email: &str, prov: &str, pay: Option<&str>) -> Customer {
        Customer::new(prov, pay.map(String::from), Email::new(email).unwrap(), None)
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = InMemoryCustomerRepository::new();
        repo.create(&customer("a@example.com", "p1", None)).await.unwrap();

        let err = repo
            .create(&customer("a@example.com", "p2", None))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn soft_deleted_customers_are_hidden() {
        let repo = InMemoryCustomerRepository::new();
        let c = customer("a@example.com", "p1", Some("cus_1"));
        repo.create(&c).await.unwrap();

        assert!(repo.soft_delete(&c.id, Timestamp::now()).await.unwrap());
        assert!(repo.find_by_id(&c.id).await.unwrap().is_none());
        assert!(repo.find_by_payments_id("cus_1").await.unwrap().is_none());
        assert!(!repo.soft_delete(&c.id, Timestamp::now()).await.unwrap());
        assert_eq!(repo.count().await, 1);
    }
}
