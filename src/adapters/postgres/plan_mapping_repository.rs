//! PostgreSQL implementation of PlanMappingRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::map_db_error;
use crate::domain::foundation::DomainError;
use crate::domain::sync::PlanMapping;
use crate::ports::PlanMappingRepository;

pub struct PostgresPlanMappingRepository {
    pool: PgPool,
}

impl PostgresPlanMappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanMappingRow {
    provider: String,
    external_plan_id: String,
    provisioning_plan_id: String,
}

impl From<PlanMappingRow> for PlanMapping {
    fn from(row: PlanMappingRow) -> Self {
        PlanMapping::new(row.provider, row.external_plan_id, row.provisioning_plan_id)
    }
}

#[async_trait]
impl PlanMappingRepository for PostgresPlanMappingRepository {
    async fn find(
        &self,
        provider: &str,
        external_plan_id: &str,
    ) -> Result<Option<PlanMapping>, DomainError> {
        let row: Option<PlanMappingRow> = sqlx::query_as(
            r#"
            SELECT provider, external_plan_id, provisioning_plan_id
            FROM plan_mappings
            WHERE provider = $1 AND external_plan_id = $2
            "#,
        )
        .bind(provider)
        .bind(external_plan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "fetch plan mapping"))?;

        Ok(row.map(PlanMapping::from))
    }

    async fn upsert(&self, mapping: &PlanMapping) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO plan_mappings (provider, external_plan_id, provisioning_plan_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider, external_plan_id)
            DO UPDATE SET provisioning_plan_id = EXCLUDED.provisioning_plan_id,
                          updated_at = NOW()
            "#,
        )
        .bind(&mapping.provider)
        .bind(&mapping.external_plan_id)
        .bind(&mapping.provisioning_plan_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "upsert plan mapping"))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<PlanMapping>, DomainError> {
        let rows: Vec<PlanMappingRow> = sqlx::query_as(
            r#"
            SELECT provider, external_plan_id, provisioning_plan_id
            FROM plan_mappings
            ORDER BY provider, external_plan_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "list plan mappings"))?;

        Ok(rows.into_iter().map(PlanMapping::from).collect())
    }
}
