//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::application::handlers::customer::UpdateCustomerCommand;
use crate::application::handlers::subscription::{SyncItemError, SyncSummary};
use crate::config::AppConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::sync::Customer;
use crate::ports::SubscriptionSummary;

// ════════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════════

/// Error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category code for programmatic handling.
    pub error: String,
    pub message: String,
    /// Whether the same request may succeed if sent again.
    pub retryable: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin: sync
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Internal id or payments id. Absent means sync everything.
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub synced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SyncErrorResponse>>,
}

impl From<SyncSummary> for SyncResponse {
    fn from(summary: SyncSummary) -> Self {
        let success = summary.is_clean();
        let message = if success {
            format!("Synced {} subscriptions", summary.synced)
        } else {
            format!(
                "Synced {} subscriptions with {} errors",
                summary.synced,
                summary.errors.len()
            )
        };
        let errors = (!success).then(|| {
            summary
                .errors
                .into_iter()
                .map(SyncErrorResponse::from)
                .collect()
        });

        Self {
            success,
            message,
            synced: summary.synced,
            errors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncErrorResponse {
    pub subscription_id: String,
    pub message: String,
}

impl From<SyncItemError> for SyncErrorResponse {
    fn from(err: SyncItemError) -> Self {
        Self {
            subscription_id: err.subscription_id.to_string(),
            message: err.message,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin: customers
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerQuery {
    pub email: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomerBody {
    pub email: Option<String>,
    pub name: Option<String>,
    pub organization: Option<String>,
}

impl From<UpdateCustomerBody> for UpdateCustomerCommand {
    fn from(body: UpdateCustomerBody) -> Self {
        Self {
            email: body.email,
            name: body.name,
            organization: body.organization,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub provisioning_customer_id: String,
    pub payments_customer_id: Option<String>,
    pub email: String,
    pub name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            provisioning_customer_id: customer.provisioning_customer_id,
            payments_customer_id: customer.payments_customer_id,
            email: customer.email.as_str().to_string(),
            name: customer.name,
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Health
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when every check passes, `degraded` otherwise.
    pub status: String,
    pub checks: HealthChecks,
    pub configuration: ConfigPresence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<SubscriptionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub store: CheckResult,
    pub provisioning: CheckResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn from_result<T, E: std::fmt::Display>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self {
                healthy: true,
                error: None,
            },
            Err(err) => Self {
                healthy: false,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Which integrations are configured. Values are never exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPresence {
    pub database: bool,
    pub payments: bool,
    pub webhook_secret: bool,
    pub provisioning: bool,
    pub admin_secret: bool,
}

impl From<&AppConfig> for ConfigPresence {
    fn from(config: &AppConfig) -> Self {
        Self {
            database: config.database.is_configured(),
            payments: !config.payment.stripe_api_key.is_empty(),
            webhook_secret: !config.payment.stripe_webhook_secret.is_empty(),
            provisioning: !config.provisioning.api_url.is_empty(),
            admin_secret: !config.admin.api_secret.is_empty(),
        }
    }
}

impl ConfigPresence {
    pub fn is_complete(&self) -> bool {
        self.payments && self.webhook_secret && self.provisioning && self.admin_secret
    }
}
