//! In-memory webhook ledger.

use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::sync::{WebhookLog, WebhookStatus};
use crate::ports::{RecordOutcome, WebhookLogRepository};

/// In-memory ledger. The write lock makes insert-if-absent atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookLogRepository {
    entries: Arc<RwLock<HashMap<String, WebhookLog>>>,
}

impl InMemoryWebhookLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn all(&self) -> Vec<WebhookLog> {
        self.entries.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl WebhookLogRepository for InMemoryWebhookLogRepository {
    async fn record(&self, entry: &WebhookLog) -> Result<RecordOutcome, DomainError> {
        let mut entries = self.entries.write().await;
        match entries.entry(entry.idempotency_key.clone()) {
            Entry::Occupied(_) => Ok(RecordOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(RecordOutcome::Inserted)
            }
        }
    }

    async fn advance(
        &self,
        idempotency_key: &str,
        status: WebhookStatus,
        error_message: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(idempotency_key)
            .ok_or_else(|| DomainError::not_found("Webhook log", idempotency_key))?;

        if !entry.status.can_transition_to(status) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot move webhook log from {} to {}", entry.status, status),
            )
            .with_detail("idempotency_key", idempotency_key));
        }

        entry.status = status;
        if let Some(message) = error_message {
            entry.error_message = Some(message.to_string());
        }
        Ok(())
    }

    async fn find(&self, idempotency_key: &str) -> Result<Option<WebhookLog>, DomainError> {
        Ok(self.entries.read().await.get(idempotency_key).cloned())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.created_at.is_before(&cutoff));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str) -> WebhookLog {
        WebhookLog::received(key, "stripe", "customer.subscription.updated", json!({}))
    }

    #[tokio::test]
    async fn second_record_reports_already_exists() {
        let repo = InMemoryWebhookLogRepository::new();
        assert_eq!(repo.record(&entry("stripe:evt_1")).await.unwrap(), RecordOutcome::Inserted);
        assert_eq!(
            repo.record(&entry("stripe:evt_1")).await.unwrap(),
            RecordOutcome::AlreadyExists
        );
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_records_have_one_winner() {
        let repo = InMemoryWebhookLogRepository::new();
        let mut tasks = Vec::new();
        for _ in 0..10 {
            let repo = repo.clone();
            tasks.push(tokio::spawn(async move {
                repo.record(&entry("stripe:evt_race")).await.unwrap()
            }));
        }
        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap() == RecordOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn advance_refuses_backward_transition() {
        let repo = InMemoryWebhookLogRepository::new();
        repo.record(&entry("k")).await.unwrap();
        repo.advance("k", WebhookStatus::Processing, None).await.unwrap();
        repo.advance("k", WebhookStatus::Success, None).await.unwrap();

        let err = repo
            .advance("k", WebhookStatus::Processing, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[tokio::test]
    async fn error_entries_can_be_annotated() {
        let repo = InMemoryWebhookLogRepository::new();
        repo.record(&entry("k")).await.unwrap();
        repo.advance("k", WebhookStatus::Processing, None).await.unwrap();
        repo.advance("k", WebhookStatus::Error, Some("first")).await.unwrap();
        repo.advance("k", WebhookStatus::Error, Some("second")).await.unwrap();

        let stored = repo.find("k").await.unwrap().unwrap();
        assert_eq!(stored.error_message.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn advance_unknown_key_is_not_found() {
        let repo = InMemoryWebhookLogRepository::new();
        let err = repo
            .advance("missing", WebhookStatus::Processing, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn delete_before_removes_old_entries() {
        let repo = InMemoryWebhookLogRepository::new();
        let mut old = entry("old");
        old.created_at = Timestamp::now().minus_days(40);
        repo.record(&old).await.unwrap();
        repo.record(&entry("new")).await.unwrap();

        let deleted = repo.delete_before(Timestamp::now().minus_days(30)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.find("old").await.unwrap().is_none());
        assert!(repo.find("new").await.unwrap().is_some());
    }
}
