//! PurgeWebhookLogsHandler - Retention sweep for the webhook ledger.

use std::sync::Arc;

use crate::application::RequestContext;
use crate::domain::foundation::Timestamp;
use crate::domain::sync::SyncError;
use crate::ports::WebhookLogRepository;

pub struct PurgeWebhookLogsHandler {
    ledger: Arc<dyn WebhookLogRepository>,
    retention_days: i64,
}

impl PurgeWebhookLogsHandler {
    pub fn new(ledger: Arc<dyn WebhookLogRepository>, retention_days: i64) -> Self {
        Self {
            ledger,
            retention_days,
        }
    }

    /// Deletes ledger entries older than the retention window.
    pub async fn handle(&self, ctx: &RequestContext) -> Result<u64, SyncError> {
        let cutoff = Timestamp::now().minus_days(self.retention_days);
        let deleted = self.ledger.delete_before(cutoff).await?;
        tracing::info!(
            request_id = %ctx.request_id,
            deleted,
            retention_days = self.retention_days,
            "Purged webhook ledger"
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryWebhookLogRepository;
    use crate::domain::sync::WebhookLog;

    #[tokio::test]
    async fn purges_only_entries_past_retention() {
        let ledger = Arc::new(InMemoryWebhookLogRepository::new());
        let mut old = WebhookLog::received("stripe:old", "stripe", "x", serde_json::json!({}));
        old.created_at = Timestamp::now().minus_days(120);
        ledger.record(&old).await.unwrap();
        ledger
            .record(&WebhookLog::received("stripe:new", "stripe", "x", serde_json::json!({})))
            .await
            .unwrap();

        let handler = PurgeWebhookLogsHandler::new(ledger.clone(), 90);
        let deleted = handler.handle(&RequestContext::new("test")).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(ledger.count().await, 1);
    }
}
