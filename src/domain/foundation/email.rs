//! Email address value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

const MAX_EMAIL_LEN: usize = 254;

/// A normalized (trimmed, lowercased) email address.
///
/// Validation is structural only: one `@`, a non-empty local part and a
/// dotted domain without leading/trailing dots or whitespace anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parses and normalizes an email address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let value = raw.as_ref().trim().to_lowercase();

        if value.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        if value.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::invalid_format("email", "too long"));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ValidationError::invalid_format("email", "contains whitespace"));
        }

        let (local, domain) = value
            .split_once('@')
            .ok_or_else(|| ValidationError::invalid_format("email", "missing @ symbol"))?;

        if local.is_empty() {
            return Err(ValidationError::invalid_format("email", "empty local part"));
        }
        if domain.contains('@') {
            return Err(ValidationError::invalid_format("email", "multiple @ symbols"));
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(ValidationError::invalid_format("email", "invalid domain"));
        }
        if domain.contains("..") {
            return Err(ValidationError::invalid_format("email", "invalid domain"));
        }

        Ok(Self(value))
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}
