//! PostgreSQL implementation of WebhookLogRepository.
//!
//! The insert relies on the primary key on `idempotency_key` with
//! `ON CONFLICT DO NOTHING`; zero affected rows means another delivery
//! already recorded the event. Status changes are guarded in SQL so two
//! writers cannot move an entry backwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{corrupt_column, map_db_error};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::sync::{WebhookLog, WebhookStatus};
use crate::ports::{RecordOutcome, WebhookLogRepository};

pub struct PostgresWebhookLogRepository {
    pool: PgPool,
}

impl PostgresWebhookLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookLogRow {
    idempotency_key: String,
    source: String,
    event_type: String,
    status: String,
    payload: serde_json::Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<WebhookLogRow> for WebhookLog {
    type Error = DomainError;

    fn try_from(row: WebhookLogRow) -> Result<Self, Self::Error> {
        let status =
            WebhookStatus::parse(&row.status).ok_or_else(|| corrupt_column("status", &row.status))?;
        Ok(WebhookLog {
            idempotency_key: row.idempotency_key,
            source: row.source,
            event_type: row.event_type,
            status,
            payload: row.payload,
            error_message: row.error_message,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl WebhookLogRepository for PostgresWebhookLogRepository {
    async fn record(&self, entry: &WebhookLog) -> Result<RecordOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_logs (
                idempotency_key, source, event_type, status, payload, error_message, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(&entry.idempotency_key)
        .bind(&entry.source)
        .bind(&entry.event_type)
        .bind(entry.status.as_str())
        .bind(&entry.payload)
        .bind(&entry.error_message)
        .bind(entry.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "record webhook log"))?;

        if result.rows_affected() == 0 {
            Ok(RecordOutcome::AlreadyExists)
        } else {
            Ok(RecordOutcome::Inserted)
        }
    }

    async fn advance(
        &self,
        idempotency_key: &str,
        status: WebhookStatus,
        error_message: Option<&str>,
    ) -> Result<(), DomainError> {
        let predecessors: Vec<String> = status
            .allowed_predecessors()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE webhook_logs SET
                status = $2,
                error_message = COALESCE($3, error_message)
            WHERE idempotency_key = $1 AND status = ANY($4)
            "#,
        )
        .bind(idempotency_key)
        .bind(status.as_str())
        .bind(error_message)
        .bind(&predecessors)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "advance webhook log"))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.find(idempotency_key).await? {
            None => Err(DomainError::not_found("Webhook log", idempotency_key)),
            Some(current) => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot move webhook log from {} to {}", current.status, status),
            )
            .with_detail("idempotency_key", idempotency_key)),
        }
    }

    async fn find(&self, idempotency_key: &str) -> Result<Option<WebhookLog>, DomainError> {
        let row: Option<WebhookLogRow> = sqlx::query_as(
            r#"
            SELECT idempotency_key, source, event_type, status, payload, error_message, created_at
            FROM webhook_logs
            WHERE idempotency_key = $1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "fetch webhook log"))?;

        row.map(WebhookLog::try_from).transpose()
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_logs WHERE created_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "purge webhook logs"))?;

        Ok(result.rows_affected())
    }
}
