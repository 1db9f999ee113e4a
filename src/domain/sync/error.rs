//! Classified failures for the sync engine.
//!
//! Every failure that crosses a component boundary is a [`SyncError`]
//! tagged with a category, a severity and a retryability verdict. Errors
//! are tagged where they arise; [`classify`] is only the fallback for
//! opaque third-party errors whose origin is unknown.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// What kind of failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Authentication,
    ExternalApi,
    Database,
    BusinessLogic,
    System,
}

impl ErrorCategory {
    /// Machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "VALIDATION_ERROR",
            ErrorCategory::Authentication => "AUTHENTICATION_ERROR",
            ErrorCategory::ExternalApi => "EXTERNAL_API_ERROR",
            ErrorCategory::Database => "DATABASE_ERROR",
            ErrorCategory::BusinessLogic => "BUSINESS_LOGIC_ERROR",
            ErrorCategory::System => "SYSTEM_ERROR",
        }
    }

    /// Default retryability for errors of this category.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::ExternalApi | ErrorCategory::Database)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How bad a failure is, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        }
    }
}

/// A classified sync failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SyncError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub retryable: bool,
    pub message: String,
    pub context: BTreeMap<String, String>,
}

impl SyncError {
    /// Creates an error with the category's default retryability and Medium severity.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: ErrorSeverity::Medium,
            retryable: category.is_retryable(),
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message).with_severity(ErrorSeverity::Low)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Authentication, message)
    }

    pub fn external_api(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ExternalApi, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Database, message).with_severity(ErrorSeverity::High)
    }

    pub fn business_logic(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::BusinessLogic, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::System, message).with_severity(ErrorSeverity::High)
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attaches a context entry (operation name, ids, etc).
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn is_critical(&self) -> bool {
        self.severity == ErrorSeverity::Critical
    }
}

/// Classifies an opaque error by keyword.
///
/// Only use this for errors from code that does not produce a
/// [`SyncError`] itself, such as provider responses that could not be
/// decoded. Matching is case-insensitive on the error's display text.
pub fn classify(error: &dyn Error, context: &str) -> SyncError {
    let text = error.to_string();
    let lower = text.to_lowercase();

    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let base = if has_any(&["network", "timeout", "timed out", "fetch"]) {
        SyncError::external_api(text)
    } else if has_any(&["database", "sql", "connection"]) {
        SyncError::database(text)
    } else if has_any(&["unauthorized", "forbidden", "token"]) {
        SyncError::authentication(text)
    } else if has_any(&["validation", "invalid", "required"]) {
        SyncError::validation(text)
    } else {
        SyncError::system(text)
    };

    base.with_severity(ErrorSeverity::Medium)
        .with_context("operation", context)
}

impl From<DomainError> for SyncError {
    fn from(err: DomainError) -> Self {
        let base = match err.code {
            ErrorCode::ValidationFailed => SyncError::validation(err.message.clone()),
            ErrorCode::NotFound
            | ErrorCode::Conflict
            | ErrorCode::InvalidStateTransition => SyncError::business_logic(err.message.clone()),
            ErrorCode::DatabaseError => SyncError::database(err.message.clone()),
            ErrorCode::InternalError => SyncError::system(err.message.clone()),
        };
        err.details
            .into_iter()
            .fold(base.with_context("code", err.code.to_string()), |acc, (k, v)| {
                acc.with_context(k, v)
            })
    }
}

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::validation(err.to_string())
    }
}
