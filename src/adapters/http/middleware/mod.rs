//! HTTP middleware for axum.
//!
//! - `admin_auth` - Bearer-secret check for admin routes

pub mod admin_auth;

pub use admin_auth::require_admin;
