//! Provisioning provider port.
//!
//! The provisioning provider owns hosting accounts: customers, their
//! subscriptions and whether those subscriptions are serving. It is the
//! system of record for which plan a subscription is entitled to.
//!
//! # Design
//!
//! - **Create-or-fetch**: every `create_*` has a matching `find_*` so
//!   onboarding steps can be resumed after partial failure.
//! - **Deduplicating references**: subscription creation carries an
//!   external reference the provider can deduplicate on.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::domain::sync::{classify, ErrorSeverity, ProvisioningStatus, SyncError};

/// Port for the hosting provisioning system.
#[async_trait]
pub trait ProvisioningProvider: Send + Sync {
    /// Look up a customer by email.
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProvisionedCustomer>, ProvisioningError>;

    /// Create a customer account with an organization.
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProvisionedCustomer, ProvisioningError>;

    /// Update a customer's profile. Absent fields are left untouched.
    async fn update_customer(
        &self,
        customer_id: &str,
        request: UpdateCustomerRequest,
    ) -> Result<ProvisionedCustomer, ProvisioningError>;

    /// Find a customer's subscription created with `reference`.
    async fn find_subscription_by_reference(
        &self,
        customer_id: &str,
        reference: &str,
    ) -> Result<Option<ProvisionedSubscription>, ProvisioningError>;

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<ProvisionedSubscription, ProvisioningError>;

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProvisionedSubscription>, ProvisioningError>;

    async fn suspend_subscription(&self, subscription_id: &str) -> Result<(), ProvisioningError>;

    async fn reactivate_subscription(&self, subscription_id: &str)
        -> Result<(), ProvisioningError>;

    /// Move a subscription to another plan.
    async fn change_plan(
        &self,
        subscription_id: &str,
        plan_id: &str,
    ) -> Result<(), ProvisioningError>;

    /// Connectivity check for health reporting.
    async fn ping(&self) -> Result<(), ProvisioningError>;
}

/// Request to create a provisioning customer.
#[derive(Debug, Clone)]
pub struct CreateCustomerRequest {
    pub email: String,
    pub name: Option<String>,
    pub password: SecretString,
    pub organization_name: String,
}

/// Profile changes for a provisioning customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCustomerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl UpdateCustomerRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.organization.is_none()
    }
}

/// Request to create a provisioning subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubscriptionRequest {
    pub customer_id: String,
    pub plan_id: String,
    /// External reference the provider deduplicates on.
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedCustomer {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedSubscription {
    pub id: String,
    pub customer_id: String,
    pub plan_id: String,
    pub status: ProvisioningStatus,
    pub reference: Option<String>,
}

/// Provisioning provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningError {
    pub code: ProvisioningErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl ProvisioningError {
    pub fn new(code: ProvisioningErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorCode::NetworkError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorCode::Unauthorized, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(ProvisioningErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorCode::Conflict, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorCode::ServiceUnavailable, message)
    }
}

impl std::fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ProvisioningError {}

impl From<ProvisioningError> for SyncError {
    fn from(err: ProvisioningError) -> Self {
        let message = format!("Provisioning provider: {}", err.message);
        let base = match err.code {
            ProvisioningErrorCode::NotFound | ProvisioningErrorCode::Conflict => {
                SyncError::business_logic(message)
            }
            ProvisioningErrorCode::Unauthorized => SyncError::external_api(message)
                .with_retryable(false)
                .with_severity(ErrorSeverity::Critical),
            // Undecodable bodies and unexpected statuses carry no code to go on.
            ProvisioningErrorCode::Unknown => SyncError {
                message,
                ..classify(&err, "provisioning")
            },
            _ => SyncError::external_api(message).with_retryable(err.retryable),
        };
        base.with_context("provisioning_error_code", err.code.to_string())
    }
}

/// Provisioning error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningErrorCode {
    NetworkError,
    Unauthorized,
    NotFound,
    Conflict,
    RateLimited,
    ServiceUnavailable,
    InvalidRequest,
    Unknown,
}

impl ProvisioningErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProvisioningErrorCode::NetworkError
                | ProvisioningErrorCode::RateLimited
                | ProvisioningErrorCode::ServiceUnavailable
        )
    }
}

impl std::fmt::Display for ProvisioningErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProvisioningErrorCode::NetworkError => "network_error",
            ProvisioningErrorCode::Unauthorized => "unauthorized",
            ProvisioningErrorCode::NotFound => "not_found",
            ProvisioningErrorCode::Conflict => "conflict",
            ProvisioningErrorCode::RateLimited => "rate_limited",
            ProvisioningErrorCode::ServiceUnavailable => "service_unavailable",
            ProvisioningErrorCode::InvalidRequest => "invalid_request",
            ProvisioningErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
