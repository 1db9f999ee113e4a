//! Plan mapping resolution.

use std::sync::Arc;

use crate::domain::sync::SyncError;
use crate::ports::PlanMappingRepository;

/// Resolves billing plan ids to provisioning plan ids.
///
/// Reads the store on every call; there is no in-process cache.
#[derive(Clone)]
pub struct PlanMappingResolver {
    repository: Arc<dyn PlanMappingRepository>,
}

impl PlanMappingResolver {
    pub fn new(repository: Arc<dyn PlanMappingRepository>) -> Self {
        Self { repository }
    }

    /// Returns the provisioning plan for `(provider, external_plan_id)`.
    ///
    /// A missing mapping is a non-retryable business-logic error.
    pub async fn resolve(&self, provider: &str, external_plan_id: &str) -> Result<String, SyncError> {
        self.lookup(provider, external_plan_id)
            .await?
            .ok_or_else(|| {
                SyncError::business_logic(format!(
                    "No plan mapping for {} plan {}",
                    provider, external_plan_id
                ))
                .with_context("provider", provider)
                .with_context("external_plan_id", external_plan_id)
            })
    }

    /// Like [`resolve`](Self::resolve), with a missing mapping as `None`.
    pub async fn lookup(
        &self,
        provider: &str,
        external_plan_id: &str,
    ) -> Result<Option<String>, SyncError> {
        let mapping = self.repository.find(provider, external_plan_id).await?;
        Ok(mapping.map(|m| m.provisioning_plan_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlanMappingRepository;
    use crate::domain::sync::{ErrorCategory, PlanMapping};

    #[tokio::test]
    async fn resolves_known_mapping() {
        let repo = Arc::new(InMemoryPlanMappingRepository::with_mappings(vec![
            PlanMapping::new("stripe", "price_pro_monthly", "pro-hosting-plan"),
        ]));
        let resolver = PlanMappingResolver::new(repo);

        let plan = resolver.resolve("stripe", "price_pro_monthly").await.unwrap();
        assert_eq!(plan, "pro-hosting-plan");
    }

    #[tokio::test]
    async fn missing_mapping_is_non_retryable_business_logic() {
        let resolver = PlanMappingResolver::new(Arc::new(InMemoryPlanMappingRepository::new()));

        let err = resolver.resolve("stripe", "price_unknown").await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::BusinessLogic);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn lookup_reports_missing_mapping_as_none() {
        let resolver = PlanMappingResolver::new(Arc::new(InMemoryPlanMappingRepository::new()));
        assert_eq!(resolver.lookup("stripe", "price_legacy").await.unwrap(), None);
    }

    #[tokio::test]
    async fn provider_is_part_of_the_key() {
        let repo = Arc::new(InMemoryPlanMappingRepository::with_mappings(vec![
            PlanMapping::new("paddle", "price_pro_monthly", "pro-hosting-plan"),
        ]));
        let resolver = PlanMappingResolver::new(repo);
        assert!(resolver.resolve("stripe", "price_pro_monthly").await.is_err());
    }
}
