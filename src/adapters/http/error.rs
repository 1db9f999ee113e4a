//! API error responses.
//!
//! Every failure leaves the service as `{error, message, retryable}` so the
//! payments provider and admin tooling can tell a permanent rejection from
//! one worth redelivering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::ErrorResponse;
use crate::domain::foundation::ValidationError;
use crate::domain::sync::{ErrorCategory, SyncError};

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Sync(SyncError),
    NotFound(String),
    Unauthorized,
}

impl ApiError {
    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(format!("{} not found", resource))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Sync(err) => match err.category {
                ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                ErrorCategory::Authentication => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Sync(err) => ErrorResponse {
                error: err.category.code().to_string(),
                message: err.message.clone(),
                retryable: err.retryable,
            },
            ApiError::NotFound(message) => ErrorResponse {
                error: "NOT_FOUND".to_string(),
                message: message.clone(),
                retryable: false,
            },
            ApiError::Unauthorized => ErrorResponse {
                error: ErrorCategory::Authentication.code().to_string(),
                message: "Missing or invalid admin credentials".to_string(),
                retryable: false,
            },
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        ApiError::Sync(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Sync(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
