//! File-based plan mapping seed.
//!
//! Reads a YAML file of billing-plan to provisioning-plan mappings and
//! upserts them at startup:
//!
//! ```yaml
//! plan_mappings:
//!   - provider: stripe
//!     external_plan_id: price_pro_monthly
//!     provisioning_plan_id: pro-hosting-plan
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

use crate::domain::sync::PlanMapping;
use crate::ports::PlanMappingRepository;

#[derive(Debug, Error)]
pub enum PlanSeedError {
    #[error("Failed to read plan mappings: {0}")]
    Io(String),

    #[error("Failed to parse plan mappings: {0}")]
    Parse(String),

    #[error("Invalid plan mapping #{index}: {reason}")]
    Invalid { index: usize, reason: &'static str },

    #[error("Failed to store plan mapping: {0}")]
    Store(String),
}

#[derive(Debug, Deserialize)]
struct PlanMappingFile {
    #[serde(default)]
    plan_mappings: Vec<PlanMappingEntry>,
}

#[derive(Debug, Deserialize)]
struct PlanMappingEntry {
    provider: String,
    external_plan_id: String,
    provisioning_plan_id: String,
}

/// Parses and validates a plan mapping document.
pub fn parse_plan_mappings(yaml: &str) -> Result<Vec<PlanMapping>, PlanSeedError> {
    let file: PlanMappingFile =
        serde_yaml::from_str(yaml).map_err(|e| PlanSeedError::Parse(e.to_string()))?;

    file.plan_mappings
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let reason = if entry.provider.trim().is_empty() {
                Some("empty provider")
            } else if entry.external_plan_id.trim().is_empty() {
                Some("empty external_plan_id")
            } else if entry.provisioning_plan_id.trim().is_empty() {
                Some("empty provisioning_plan_id")
            } else {
                None
            };
            match reason {
                Some(reason) => Err(PlanSeedError::Invalid { index, reason }),
                None => Ok(PlanMapping::new(
                    entry.provider.trim(),
                    entry.external_plan_id.trim(),
                    entry.provisioning_plan_id.trim(),
                )),
            }
        })
        .collect()
}

/// Loads `path` and upserts every mapping. Returns the number upserted.
pub async fn seed_plan_mappings(
    repository: &dyn PlanMappingRepository,
    path: impl AsRef<Path>,
) -> Result<usize, PlanSeedError> {
    let yaml = fs::read_to_string(path.as_ref())
        .await
        .map_err(|e| PlanSeedError::Io(e.to_string()))?;
    let mappings = parse_plan_mappings(&yaml)?;

    for mapping in &mappings {
        repository
            .upsert(mapping)
            .await
            .map_err(|e| PlanSeedError::Store(e.to_string()))?;
    }

    tracing::info!(
        path = %path.as_ref().display(),
        count = mappings.len(),
        "Plan mappings seeded"
    );
    Ok(mappings.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlanMappingRepository;
    use std::io::Write;

    const YAML: &str = r#"
plan_mappings:
  - provider: stripe
    external_plan_id: price_basic
    provisioning_plan_id: basic-hosting-plan
  - provider: stripe
    external_plan_id: price_pro_monthly
    provisioning_plan_id: pro-hosting-plan
"#;

    #[test]
    fn parses_entries() {
        let mappings = parse_plan_mappings(YAML).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[1].provisioning_plan_id, "pro-hosting-plan");
    }

    #[test]
    fn empty_field_is_invalid() {
        let yaml = "plan_mappings:\n  - provider: stripe\n    external_plan_id: ''\n    provisioning_plan_id: x\n";
        assert!(matches!(
            parse_plan_mappings(yaml),
            Err(PlanSeedError::Invalid { index: 0, .. })
        ));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        assert!(matches!(
            parse_plan_mappings("plan_mappings: [oops"),
            Err(PlanSeedError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn seeds_from_file_and_upserts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let repo = InMemoryPlanMappingRepository::with_mappings(vec![PlanMapping::new(
            "stripe",
            "price_basic",
            "legacy-plan",
        )]);

        let count = seed_plan_mappings(&repo, file.path()).await.unwrap();

        assert_eq!(count, 2);
        let basic = repo.find("stripe", "price_basic").await.unwrap().unwrap();
        assert_eq!(basic.provisioning_plan_id, "basic-hosting-plan");
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let repo = InMemoryPlanMappingRepository::new();
        let err = seed_plan_mappings(&repo, "/nonexistent/plans.yaml").await.unwrap_err();
        assert!(matches!(err, PlanSeedError::Io(_)));
    }
}
