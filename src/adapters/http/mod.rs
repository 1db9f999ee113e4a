//! HTTP adapters - axum routes for webhook intake, admin operations and health.
//!
//! # Module Organization
//!
//! - `webhook` - `POST /webhooks/stripe`
//! - `admin` - sync and customer endpoints behind `middleware::require_admin`
//! - `health` - `GET /health`
//! - `state` - `AppState` and handler factories

mod admin;
pub mod dto;
mod error;
mod health;
pub mod middleware;
mod router;
mod state;
mod webhook;

pub use error::ApiError;
pub use router::{admin_routes, build_router};
pub use state::{AppState, AppStateParts};

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::application::RequestContext;

/// Builds the request context, reusing the `x-request-id` set by the router.
pub(crate) fn request_context(source: &str, headers: &HeaderMap) -> RequestContext {
    let ctx = RequestContext::new(source);
    match headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
    {
        Some(id) => ctx.with_request_id(id),
        None => ctx,
    }
}
