//! Provisioning API configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    /// Base URL of the provisioning API
    pub api_url: String,

    /// Bearer token for the provisioning API
    pub api_token: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ProvisioningConfig {
    pub fn api_token(&self) -> SecretString {
        SecretString::new(self.api_token.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_url.is_empty() {
            return Err(ValidationError::MissingRequired("PROVISIONING_API_URL"));
        }
        if self.api_token.is_empty() {
            return Err(ValidationError::MissingRequired("PROVISIONING_API_TOKEN"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ValidationError::InvalidProvisioningUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
