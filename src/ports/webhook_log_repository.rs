//! WebhookLogRepository port - The idempotency ledger.
//!
//! Payments providers deliver events at least once, and concurrently when
//! our endpoint is slow. The ledger turns that into at-most-once side-effect
//! application: the first delivery to insert its key wins, every later one
//! sees `AlreadyExists`.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::sync::{WebhookLog, WebhookStatus};

/// Result of attempting to record a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (duplicate event).
    AlreadyExists,
}

/// Port for the webhook ledger.
///
/// Implementations must insert atomically under the unique key
/// (`ON CONFLICT DO NOTHING` or equivalent), never check-then-insert.
#[async_trait]
pub trait WebhookLogRepository: Send + Sync {
    /// Insert a `received` entry.
    ///
    /// Returns `AlreadyExists` if the key is present in any state.
    async fn record(&self, entry: &WebhookLog) -> Result<RecordOutcome, DomainError>;

    /// Move an entry forward.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the key doesn't exist
    /// - `InvalidStateTransition` for backward or skipping transitions
    async fn advance(
        &self,
        idempotency_key: &str,
        status: WebhookStatus,
        error_message: Option<&str>,
    ) -> Result<(), DomainError>;

    async fn find(&self, idempotency_key: &str) -> Result<Option<WebhookLog>, DomainError>;

    /// Delete entries created before `cutoff`. Returns the number deleted.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
