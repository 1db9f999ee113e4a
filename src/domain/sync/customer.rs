//! Customer entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, Email, Timestamp};

/// A customer known to both external systems.
///
/// Exactly one Customer exists per provisioning-system customer id.
/// Customers are never hard-deleted; `deleted_at` hides them from lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub provisioning_customer_id: String,
    pub payments_customer_id: Option<String>,
    pub email: Email,
    pub name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Customer {
    /// Creates a new customer linked to a provisioning account.
    pub fn new(
        provisioning_customer_id: impl Into<String>,
        payments_customer_id: Option<String>,
        email: Email,
        name: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: CustomerId::new(),
            provisioning_customer_id: provisioning_customer_id.into(),
            payments_customer_id,
            email,
            name,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Applies a profile change. Absent fields are left untouched.
    pub fn update_profile(&mut self, email: Option<Email>, name: Option<String>) {
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(name) = name {
            self.name = Some(name);
        }
        self.updated_at = Timestamp::now();
    }

    /// Links the payments-system customer id if not already linked.
    pub fn link_payments_customer(&mut self, payments_customer_id: &str) {
        if self.payments_customer_id.is_none() {
            self.payments_customer_id = Some(payments_customer_id.to_string());
            self.updated_at = Timestamp::now();
        }
    }

    pub fn soft_delete(&mut self, at: Timestamp) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
            self.updated_at = at;
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
