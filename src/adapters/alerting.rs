//! Alert notifier adapters.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::sync::SyncError;
use crate::ports::AlertNotifier;

/// Emits critical errors as `error`-level events on a dedicated target,
/// for log-based alert routing.
#[derive(Debug, Clone, Default)]
pub struct TracingAlertNotifier;

impl TracingAlertNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertNotifier for TracingAlertNotifier {
    async fn notify_critical(&self, error: &SyncError) {
        tracing::error!(
            target: "subscription_sync::alert",
            category = error.category.code(),
            context = ?error.context,
            "CRITICAL: {}",
            error.message
        );
    }
}

/// Collects alerts in memory for assertions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertNotifier {
    alerts: Arc<RwLock<Vec<String>>>,
}

impl InMemoryAlertNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn alerts(&self) -> Vec<String> {
        self.alerts.read().await.clone()
    }
}

#[async_trait]
impl AlertNotifier for InMemoryAlertNotifier {
    async fn notify_critical(&self, error: &SyncError) {
        self.alerts.write().await.push(error.message.clone());
    }
}
