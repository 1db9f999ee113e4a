//! Reconciliation tuning: retries, sweep concurrency, ledger retention.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Total attempts per remote or database call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of uniform jitter, in milliseconds
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    /// Subscriptions reconciled concurrently during a bulk sync
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Webhook ledger entries older than this are purged
    #[serde(default = "default_retention_days")]
    pub webhook_retention_days: i64,

    /// Optional YAML file of plan mappings seeded at startup
    pub plan_mappings_path: Option<String>,

    /// Run a bulk sync this often. Absent disables the periodic sweep.
    pub interval_secs: Option<u64>,
}

impl SyncConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_jitter_ms),
        )
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        if !(1..=64).contains(&self.concurrency) {
            return Err(ValidationError::InvalidConcurrency);
        }
        if self.interval_secs == Some(0) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            concurrency: default_concurrency(),
            webhook_retention_days: default_retention_days(),
            plan_mappings_path: None,
            interval_secs: None,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    4
}

fn default_retention_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_retry_policy_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.webhook_retention_days, 30);
    }

    #[test]
    fn test_validation_bounds() {
        let zero_attempts = SyncConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(
            zero_attempts.validate(),
            Err(ValidationError::InvalidRetryAttempts)
        );

        let too_wide = SyncConfig {
            concurrency: 100,
            ..Default::default()
        };
        assert_eq!(too_wide.validate(), Err(ValidationError::InvalidConcurrency));

        let zero_interval = SyncConfig {
            interval_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(zero_interval.validate(), Err(ValidationError::InvalidTimeout));
    }

    #[test]
    fn test_periodic_sync_is_off_by_default() {
        assert!(SyncConfig::default().interval().is_none());
    }
}
