//! HTTP adapter for the provisioning provider's JSON REST API.
//!
//! Authenticates with a bearer token. Creation requests carry an
//! `Idempotency-Key` header so retried POSTs do not create duplicates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ports::{
    CreateCustomerRequest, CreateSubscriptionRequest, ProvisionedCustomer,
    ProvisionedSubscription, ProvisioningError, ProvisioningErrorCode, ProvisioningProvider,
    UpdateCustomerRequest,
};

/// Provisioning API configuration.
#[derive(Clone)]
pub struct ProvisioningConfig {
    api_url: String,
    api_token: SecretString,
    timeout: Duration,
}

impl ProvisioningConfig {
    pub fn new(api_url: impl Into<String>, api_token: SecretString) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Provisioning provider backed by its REST API.
pub struct HttpProvisioningAdapter {
    config: ProvisioningConfig,
    http_client: reqwest::Client,
}

// ════════════════════════════════════════════════════════════════════════════
// Wire types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct CreateCustomerBody<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    password: &'a str,
    organization: OrganizationBody<'a>,
}

#[derive(Debug, Serialize)]
struct OrganizationBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateSubscriptionBody<'a> {
    customer_id: &'a str,
    plan_id: &'a str,
    reference: &'a str,
}

#[derive(Debug, Serialize)]
struct ChangePlanBody<'a> {
    plan_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HttpProvisioningAdapter {
    pub fn new(config: ProvisioningConfig) -> Result<Self, ProvisioningError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProvisioningError::network(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.config.api_url, path))
            .bearer_auth(self.config.api_token.expose_secret())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProvisioningError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProvisioningError::network(format!("Provisioning API timeout: {}", e))
            } else {
                ProvisioningError::network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = error_from_response(status, &body);
        tracing::warn!(
            status = status.as_u16(),
            code = %error.code,
            "Provisioning API request failed"
        );
        Err(error)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ProvisioningError> {
        response.json().await.map_err(|e| {
            ProvisioningError::new(
                ProvisioningErrorCode::Unknown,
                format!("Failed to parse provisioning response: {}", e),
            )
        })
    }

    /// Like `send`, but a 404 becomes `Ok(None)`.
    async fn send_optional(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<Response>, ProvisioningError> {
        match self.send(request).await {
            Ok(response) => Ok(Some(response)),
            Err(e) if e.code == ProvisioningErrorCode::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn error_from_response(status: StatusCode, body: &str) -> ProvisioningError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("Provisioning API error ({})", status.as_u16()));

    let code = match status.as_u16() {
        401 | 403 => ProvisioningErrorCode::Unauthorized,
        404 => ProvisioningErrorCode::NotFound,
        409 => ProvisioningErrorCode::Conflict,
        429 => ProvisioningErrorCode::RateLimited,
        500..=599 => ProvisioningErrorCode::ServiceUnavailable,
        400..=499 => ProvisioningErrorCode::InvalidRequest,
        _ => ProvisioningErrorCode::Unknown,
    };
    ProvisioningError::new(code, message)
}

#[async_trait]
impl ProvisioningProvider for HttpProvisioningAdapter {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProvisionedCustomer>, ProvisioningError> {
        let request = self
            .request(Method::GET, "/customers")
            .query(&[("email", email)]);
        let list: ListResponse<ProvisionedCustomer> =
            Self::parse(self.send(request).await?).await?;
        Ok(list.data.into_iter().next())
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProvisionedCustomer, ProvisioningError> {
        let body = CreateCustomerBody {
            email: &request.email,
            name: request.name.as_deref(),
            password: request.password.expose_secret(),
            organization: OrganizationBody {
                name: &request.organization_name,
            },
        };
        let http = self
            .request(Method::POST, "/customers")
            .header("Idempotency-Key", format!("customer:{}", request.email))
            .json(&body);
        Self::parse(self.send(http).await?).await
    }

    async fn update_customer(
        &self,
        customer_id: &str,
        request: UpdateCustomerRequest,
    ) -> Result<ProvisionedCustomer, ProvisioningError> {
        let http = self
            .request(Method::PATCH, &format!("/customers/{}", customer_id))
            .json(&request);
        Self::parse(self.send(http).await?).await
    }

    async fn find_subscription_by_reference(
        &self,
        customer_id: &str,
        reference: &str,
    ) -> Result<Option<ProvisionedSubscription>, ProvisioningError> {
        let request = self
            .request(
                Method::GET,
                &format!("/customers/{}/subscriptions", customer_id),
            )
            .query(&[("reference", reference)]);
        match self.send_optional(request).await? {
            Some(response) => {
                let list: ListResponse<ProvisionedSubscription> = Self::parse(response).await?;
                Ok(list.data.into_iter().next())
            }
            None => Ok(None),
        }
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<ProvisionedSubscription, ProvisioningError> {
        let body = CreateSubscriptionBody {
            customer_id: &request.customer_id,
            plan_id: &request.plan_id,
            reference: &request.reference,
        };
        let http = self
            .request(Method::POST, "/subscriptions")
            .header("Idempotency-Key", request.reference.as_str())
            .json(&body);
        Self::parse(self.send(http).await?).await
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProvisionedSubscription>, ProvisioningError> {
        let request = self.request(Method::GET, &format!("/subscriptions/{}", subscription_id));
        match self.send_optional(request).await? {
            Some(response) => Self::parse(response).await.map(Some),
            None => Ok(None),
        }
    }

    async fn suspend_subscription(&self, subscription_id: &str) -> Result<(), ProvisioningError> {
        let request = self.request(
            Method::POST,
            &format!("/subscriptions/{}/suspend", subscription_id),
        );
        self.send(request).await.map(|_| ())
    }

    async fn reactivate_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<(), ProvisioningError> {
        let request = self.request(
            Method::POST,
            &format!("/subscriptions/{}/reactivate", subscription_id),
        );
        self.send(request).await.map(|_| ())
    }

    async fn change_plan(
        &self,
        subscription_id: &str,
        plan_id: &str,
    ) -> Result<(), ProvisioningError> {
        let request = self
            .request(Method::PATCH, &format!("/subscriptions/{}", subscription_id))
            .json(&ChangePlanBody { plan_id });
        self.send(request).await.map(|_| ())
    }

    async fn ping(&self) -> Result<(), ProvisioningError> {
        self.send(self.request(Method::GET, "/health"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_conflict() {
        let err = error_from_response(StatusCode::CONFLICT, r#"{"message":"exists"}"#);
        assert_eq!(err.code, ProvisioningErrorCode::Conflict);
        assert_eq!(err.message, "exists");
    }

    #[test]
    fn gateway_errors_are_retryable() {
        assert!(error_from_response(StatusCode::SERVICE_UNAVAILABLE, "").retryable);
    }

    #[test]
    fn forbidden_is_unauthorized() {
        assert_eq!(
            error_from_response(StatusCode::FORBIDDEN, "").code,
            ProvisioningErrorCode::Unauthorized
        );
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = ProvisioningConfig::new(
            "https://hosting.example.com/api/",
            SecretString::new("token".into()),
        );
        assert_eq!(config.api_url, "https://hosting.example.com/api");
    }

    #[test]
    fn create_customer_body_nests_organization() {
        let body = CreateCustomerBody {
            email: "jane@example.com",
            name: None,
            password: "secret",
            organization: OrganizationBody { name: "Jane" },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["organization"]["name"], "Jane");
        assert!(json.get("name").is_none());
    }
}
