//! Axum router configuration.

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::admin::{delete_customer, get_customer, sync_subscriptions, update_customer};
use super::health::health;
use super::middleware::require_admin;
use super::state::AppState;
use super::webhook::handle_stripe_webhook;

/// Admin routes, all behind the bearer secret.
///
/// # Routes
/// - `POST /sync` - Targeted or bulk subscription sync
/// - `GET /customers` - Look up by `email` or `customerId`
/// - `PATCH /customers/:id` - Update profile (provisioning first)
/// - `DELETE /customers/:id` - Soft delete
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync_subscriptions))
        .route("/customers", get(get_customer))
        .route(
            "/customers/:id",
            patch(update_customer).delete(delete_customer),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

/// Builds the complete service router.
///
/// # Routes
/// - `POST /webhooks/stripe` - Webhook intake (signature verified, no bearer)
/// - `GET /health` - Dependency and configuration health
/// - `/admin/*` - See [`admin_routes`]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/webhooks/stripe", post(handle_stripe_webhook))
        .route("/health", get(health))
        .nest("/admin", admin_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
