//! Admin API configuration

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;

const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Bearer secret required on `/admin` routes
    pub api_secret: String,
}

impl AdminConfig {
    pub fn api_secret(&self) -> SecretString {
        SecretString::new(self.api_secret.clone())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_secret.is_empty() {
            return Err(ValidationError::MissingRequired("ADMIN_API_SECRET"));
        }
        if self.api_secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::AdminSecretTooShort(MIN_SECRET_LEN));
        }
        Ok(())
    }
}
