//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt_column, map_db_error};
use crate::domain::foundation::{CustomerId, DomainError, SubscriptionId, Timestamp};
use crate::domain::sync::{Subscription, SubscriptionStatus};
use crate::ports::{SubscriptionRepository, SubscriptionSummary};

const SELECT_SUBSCRIPTION: &str = r#"
    SELECT id, customer_id, provisioning_subscription_id, payments_subscription_id,
           plan_id, status, created_at, updated_at, canceled_at
    FROM subscriptions
"#;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        filter: &str,
        value: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("{} WHERE {} = $1", SELECT_SUBSCRIPTION, filter);
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "fetch subscription"))?;
        row.map(Subscription::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    customer_id: Uuid,
    provisioning_subscription_id: String,
    payments_subscription_id: Option<String>,
    plan_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::parse(&row.status)
            .ok_or_else(|| corrupt_column("status", &row.status))?;
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            provisioning_subscription_id: row.provisioning_subscription_id,
            payments_subscription_id: row.payments_subscription_id,
            plan_id: row.plan_id,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusCountRow {
    status: String,
    count: i64,
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, customer_id, provisioning_subscription_id, payments_subscription_id,
                plan_id, status, created_at, updated_at, canceled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.customer_id.as_uuid())
        .bind(&subscription.provisioning_subscription_id)
        .bind(&subscription.payments_subscription_id)
        .bind(&subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "create subscription"))?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        // provisioning_subscription_id is immutable and never rewritten.
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                payments_subscription_id = $2,
                plan_id = $3,
                status = $4,
                updated_at = $5,
                canceled_at = $6
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(&subscription.payments_subscription_id)
        .bind(&subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "update subscription"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Subscription", subscription.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("{} WHERE id = $1", SELECT_SUBSCRIPTION);
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "fetch subscription"))?;
        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_payments_id(
        &self,
        payments_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        self.find_one("payments_subscription_id", payments_subscription_id)
            .await
    }

    async fn find_by_provisioning_id(
        &self,
        provisioning_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        self.find_one("provisioning_subscription_id", provisioning_subscription_id)
            .await
    }

    async fn list_by_statuses(
        &self,
        statuses: &[SubscriptionStatus],
    ) -> Result<Vec<Subscription>, DomainError> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!("{} WHERE status = ANY($1) ORDER BY created_at", SELECT_SUBSCRIPTION);
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(&statuses)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "list subscriptions"))?;
        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn summary(&self) -> Result<SubscriptionSummary, DomainError> {
        let rows: Vec<StatusCountRow> = sqlx::query_as(
            "SELECT status, COUNT(*) AS count FROM subscriptions GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "summarize subscriptions"))?;

        let mut summary = SubscriptionSummary::default();
        for row in rows {
            let count = u64::try_from(row.count).unwrap_or_default();
            match SubscriptionStatus::parse(&row.status) {
                Some(SubscriptionStatus::Active) => summary.active += count,
                Some(SubscriptionStatus::Suspended) => summary.suspended += count,
                Some(SubscriptionStatus::Canceled) => summary.canceled += count,
                None => return Err(corrupt_column("status", &row.status)),
            }
            summary.total += count;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_rejected() {
        let now = Utc::now();
        let row = SubscriptionRow {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            provisioning_subscription_id: "prov_sub_1".into(),
            payments_subscription_id: None,
            plan_id: "basic".into(),
            status: "paused".into(),
            created_at: now,
            updated_at: now,
            canceled_at: None,
        };
        assert!(Subscription::try_from(row).is_err());
    }
}
