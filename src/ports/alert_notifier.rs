//! Alert notifier port for critical failures.

use async_trait::async_trait;

use crate::domain::sync::SyncError;

/// Receives critical errors that need a human.
///
/// Notification is best-effort: implementations log their own delivery
/// failures instead of returning them.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify_critical(&self, error: &SyncError);
}
