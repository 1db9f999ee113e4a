//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresCustomerRepository` - `customers` table
//! - `PostgresSubscriptionRepository` - `subscriptions` table
//! - `PostgresPlanMappingRepository` - `plan_mappings` table
//! - `PostgresWebhookLogRepository` - `webhook_logs` idempotency ledger

mod customer_repository;
mod plan_mapping_repository;
mod subscription_repository;
mod webhook_log_repository;

pub use customer_repository::PostgresCustomerRepository;
pub use plan_mapping_repository::PostgresPlanMappingRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_log_repository::PostgresWebhookLogRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Maps a sqlx error to a domain error, reporting unique violations as conflicts.
pub(crate) fn map_db_error(e: sqlx::Error, action: &str) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let err = DomainError::new(
                ErrorCode::Conflict,
                format!("Failed to {}: duplicate key", action),
            );
            return match db_err.constraint() {
                Some(constraint) => err.with_detail("constraint", constraint),
                None => err,
            };
        }
    }
    DomainError::database(format!("Failed to {}: {}", action, e))
}

/// Error for a stored value that does not decode into the domain.
pub(crate) fn corrupt_column(column: &str, value: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, value),
    )
}
