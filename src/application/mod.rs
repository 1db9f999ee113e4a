//! Application layer - Handlers and the cross-cutting services they share.
//!
//! Handlers receive their collaborators by construction and a
//! `RequestContext` per call; nothing here holds process-wide state.

mod context;
pub mod handlers;
mod plan_resolver;
mod reporting;
mod retry;

pub use context::RequestContext;
pub use plan_resolver::PlanMappingResolver;
pub use reporting::ErrorReporter;
pub use retry::{with_retry, RetryPolicy};
