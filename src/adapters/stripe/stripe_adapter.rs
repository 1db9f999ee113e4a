//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::sync::STRIPE_PROVIDER;
use crate::ports::{
    PaymentError, PaymentErrorCode, PaymentProvider, PaymentsCustomer, PaymentsSubscription,
};

use super::api_types::{StripeCustomer, StripeErrorResponse, StripeSubscription};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// GETs a Stripe object; 404 maps to `None`.
    async fn get_object<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = error_from_response(status, &body);
            tracing::warn!(
                path,
                status = status.as_u16(),
                code = %error.code,
                "Stripe API request failed"
            );
            return Err(error);
        }

        response.json().await.map(Some).map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }
}

/// Maps a non-2xx Stripe response to a classified error.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|p| p.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status.as_u16()));

    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        500..=599 => PaymentErrorCode::ServiceUnavailable,
        400..=499 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match parsed.and_then(|p| p.error.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    fn provider_name(&self) -> &'static str {
        STRIPE_PROVIDER
    }

    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<PaymentsCustomer>, PaymentError> {
        let customer: Option<StripeCustomer> = self
            .get_object(&format!("/v1/customers/{}", customer_id))
            .await?;

        Ok(customer.filter(|c| !c.deleted).map(|c| PaymentsCustomer {
            id: c.id,
            email: c.email,
            name: c.name,
        }))
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<PaymentsSubscription>, PaymentError> {
        let subscription: Option<StripeSubscription> = self
            .get_object(&format!("/v1/subscriptions/{}", subscription_id))
            .await?;

        Ok(subscription.map(|s| {
            let price_id = s.first_price_id();
            PaymentsSubscription {
                id: s.id,
                customer_id: s.customer,
                status: s.status,
                price_id,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn unauthorized_maps_to_authentication() {
        let err = error_from_response(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.code, PaymentErrorCode::AuthenticationError);
        assert!(!err.retryable);
    }

    #[test]
    fn server_error_is_retryable() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(err.code, PaymentErrorCode::ServiceUnavailable);
        assert!(err.retryable);
    }

    #[test]
    fn rate_limit_is_retryable() {
        assert!(error_from_response(StatusCode::TOO_MANY_REQUESTS, "").retryable);
    }

    #[test]
    fn stripe_error_body_is_parsed() {
        let body = r#"{"error":{"code":"resource_missing","message":"No such price","type":"invalid_request_error"}}"#;
        let err = error_from_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
        assert_eq!(err.message, "No such price");
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = StripeConfig::new(SecretString::new("sk_test_x".into()))
            .with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }
}
