//! In-memory plan mapping repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::sync::PlanMapping;
use crate::ports::PlanMappingRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanMappingRepository {
    mappings: Arc<RwLock<HashMap<(String, String), PlanMapping>>>,
}

impl InMemoryPlanMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mappings(mappings: Vec<PlanMapping>) -> Self {
        let map = mappings
            .into_iter()
            .map(|m| ((m.provider.clone(), m.external_plan_id.clone()), m))
            .collect();
        Self {
            mappings: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl PlanMappingRepository for InMemoryPlanMappingRepository {
    async fn find(
        &self,
        provider: &str,
        external_plan_id: &str,
    ) -> Result<Option<PlanMapping>, DomainError> {
        let map = self.mappings.read().await;
        Ok(map
            .get(&(provider.to_string(), external_plan_id.to_string()))
            .cloned())
    }

    async fn upsert(&self, mapping: &PlanMapping) -> Result<(), DomainError> {
        let mut map = self.mappings.write().await;
        map.insert(
            (mapping.provider.clone(), mapping.external_plan_id.clone()),
            mapping.clone(),
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PlanMapping>, DomainError> {
        let map = self.mappings.read().await;
        let mut all: Vec<PlanMapping> = map.values().cloned().collect();
        all.sort_by(|a, b| {
            (&a.provider, &a.external_plan_id).cmp(&(&b.provider, &b.external_plan_id))
        });
        Ok(all)
    }
}
