//! Payment provider port for reading billing state.
//!
//! The payments provider is the source of truth for whether a customer is
//! paying. The sync engine only reads from it: customers for onboarding,
//! subscriptions for status reconciliation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::sync::{classify, ErrorSeverity, SyncError};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider tag used in idempotency keys and plan mappings.
    fn provider_name(&self) -> &'static str;

    /// Get customer by provider ID.
    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<PaymentsCustomer>, PaymentError>;

    /// Get subscription by provider ID.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<PaymentsSubscription>, PaymentError>;
}

/// Customer record from the payments provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentsCustomer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Subscription record from the payments provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentsSubscription {
    pub id: String,
    pub customer_id: String,
    /// Raw status string (`active`, `past_due`, `canceled`, ...).
    pub status: String,
    /// Price of the first subscription item.
    pub price_id: Option<String>,
}

/// Payment provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Error code reported by the provider, if any.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for SyncError {
    fn from(err: PaymentError) -> Self {
        let message = format!("Payments provider: {}", err.message);
        let base = match err.code {
            PaymentErrorCode::NotFound => SyncError::business_logic(message),
            PaymentErrorCode::AuthenticationError => SyncError::external_api(message)
                .with_retryable(false)
                .with_severity(ErrorSeverity::Critical),
            PaymentErrorCode::ProviderError => SyncError {
                message,
                ..classify(&err, "payments")
            },
            _ => SyncError::external_api(message).with_retryable(err.retryable),
        };
        let base = base.with_context("payment_error_code", err.code.to_string());
        match err.provider_code {
            Some(code) => base.with_context("provider_code", code),
            None => base,
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider returned a 5xx.
    ServiceUnavailable,

    /// Request rejected by the provider.
    InvalidRequest,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ServiceUnavailable
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ServiceUnavailable => "service_unavailable",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sync::ErrorCategory;

    #[test]
    fn network_and_rate_limit_are_retryable() {
        assert!(PaymentError::network("reset").retryable);
        assert!(PaymentError::new(PaymentErrorCode::RateLimitExceeded, "slow").retryable);
        assert!(PaymentError::new(PaymentErrorCode::ServiceUnavailable, "502").retryable);
    }

    #[test]
    fn invalid_request_is_not_retryable() {
        assert!(!PaymentError::new(PaymentErrorCode::InvalidRequest, "bad").retryable);
    }

    #[test]
    fn network_error_becomes_retryable_external_api() {
        let err: SyncError = PaymentError::network("connection reset").into();
        assert_eq!(err.category, ErrorCategory::ExternalApi);
        assert!(err.retryable);
    }

    #[test]
    fn authentication_error_is_critical_and_final() {
        let err: SyncError = PaymentError::authentication("bad key").into();
        assert_eq!(err.category, ErrorCategory::ExternalApi);
        assert!(!err.retryable);
        assert!(err.is_critical());
    }

    #[test]
    fn undecodable_response_is_classified_by_text() {
        let err: SyncError =
            PaymentError::provider("Failed to parse Stripe response: operation timed out").into();
        assert_eq!(err.category, ErrorCategory::ExternalApi);
        assert!(err.retryable);

        let err: SyncError =
            PaymentError::provider("Failed to parse Stripe response: missing field `id`").into();
        assert_eq!(err.category, ErrorCategory::System);
        assert!(!err.retryable);
        assert!(err.message.starts_with("Payments provider: "));
    }

    #[test]
    fn provider_code_is_carried_in_context() {
        let err: SyncError = PaymentError::provider("oops")
            .with_provider_code("resource_missing")
            .into();
        assert_eq!(
            err.context.get("provider_code").map(String::as_str),
            Some("resource_missing")
        );
    }
}
