//! In-memory adapters.
//!
//! Implement the repository ports on `tokio::sync::RwLock` maps. Used by
//! tests and for running the service without a database.

mod customer_repository;
mod plan_mapping_repository;
mod subscription_repository;
mod webhook_log_repository;

pub use customer_repository::InMemoryCustomerRepository;
pub use plan_mapping_repository::InMemoryPlanMappingRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use webhook_log_repository::InMemoryWebhookLogRepository;
