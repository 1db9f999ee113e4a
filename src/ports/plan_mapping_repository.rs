//! Plan mapping repository port.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::sync::PlanMapping;

/// Repository port for billing-to-provisioning plan mappings.
///
/// Read-only to the reconciliation flow; `upsert` is used by startup seeding.
#[async_trait]
pub trait PlanMappingRepository: Send + Sync {
    async fn find(
        &self,
        provider: &str,
        external_plan_id: &str,
    ) -> Result<Option<PlanMapping>, DomainError>;

    /// Insert or replace the mapping for `(provider, external_plan_id)`.
    async fn upsert(&self, mapping: &PlanMapping) -> Result<(), DomainError>;

    async fn list(&self) -> Result<Vec<PlanMapping>, DomainError>;
}
