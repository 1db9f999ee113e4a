//! Store selection.
//!
//! Setting `SUBSCRIPTION_SYNC__DATABASE__URL` selects Postgres. Without it
//! every repository is in-memory and nothing survives a restart.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 100;

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` connection URL. May carry a password, so it is
    /// never printed.
    #[serde(default)]
    pub url: String,

    /// Upper bound on pooled connections. The bulk sync holds at most
    /// `sync.concurrency` of them at once.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Apply `migrations/` before serving.
    #[serde(default)]
    pub run_migrations: bool,
}

/// Where the repositories live.
pub enum StoreBackend<'a> {
    InMemory,
    Postgres(PostgresStore<'a>),
}

/// Connection settings for the Postgres backend.
pub struct PostgresStore<'a> {
    pub url: &'a str,
    pub pool_size: u32,
    pub acquire_timeout: Duration,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    fn url(&self) -> Option<&str> {
        Some(self.url.trim()).filter(|u| !u.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.url().is_some()
    }

    pub fn backend(&self) -> StoreBackend<'_> {
        match self.url() {
            None => StoreBackend::InMemory,
            Some(url) => StoreBackend::Postgres(PostgresStore {
                url,
                pool_size: self.pool_size,
                acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
                run_migrations: self.run_migrations,
            }),
        }
    }

    /// Pool settings are only checked when Postgres is selected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(url) = self.url() else {
            return Ok(());
        };
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.pool_size == 0 {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.pool_size > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.acquire_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url().map(|_| "[REDACTED]"))
            .field("pool_size", &self.pool_size)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: default_pool_size(),
            acquire_timeout_secs: default_acquire_timeout(),
            run_migrations: false,
        }
    }
}

fn default_pool_size() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}
