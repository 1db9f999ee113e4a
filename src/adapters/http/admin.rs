//! Admin endpoints: targeted and bulk sync, customer lookup and edits.
//!
//! All routes here sit behind `require_admin`.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::Instrument;

use super::dto::{CustomerQuery, CustomerResponse, SyncRequest, SyncResponse, UpdateCustomerBody};
use super::error::ApiError;
use super::request_context;
use super::state::AppState;
use crate::application::handlers::customer::CustomerLookup;
use crate::application::handlers::subscription::SubscriptionSelector;
use crate::application::RequestContext;
use crate::domain::sync::{Customer, SyncError};

// ════════════════════════════════════════════════════════════════════════════════
// Sync
// ════════════════════════════════════════════════════════════════════════════════

/// POST /admin/sync - Reconcile one subscription, or all of them
pub async fn sync_subscriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Option<Json<SyncRequest>>,
) -> Result<Json<SyncResponse>, ApiError> {
    let ctx = request_context("admin", &headers);
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let handler = state.sync_handler();

    let summary = match request
        .subscription_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(raw) => {
            let selector = SubscriptionSelector::parse(raw);
            let result = handler
                .sync_one(&ctx, &selector)
                .instrument(ctx.span("admin_sync_one"))
                .await;
            state
                .report(&ctx, result)
                .await?
                .ok_or_else(|| ApiError::not_found("Subscription"))?
        }
        None => {
            let result = handler
                .sync_all(&ctx)
                .instrument(ctx.span("admin_sync_all"))
                .await;
            state.report(&ctx, result).await?
        }
    };

    Ok(Json(SyncResponse::from(summary)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Customers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /admin/customers?email=... or ?customerId=...
pub async fn get_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let ctx = request_context("admin", &headers);
    let lookup = match (query.customer_id.as_deref(), query.email.as_deref()) {
        (Some(id), _) if !id.trim().is_empty() => CustomerLookup::from_customer_id(id.trim()),
        (_, Some(email)) => CustomerLookup::from_email(email)?,
        _ => {
            return Err(SyncError::validation("Either email or customerId is required").into())
        }
    };

    let customer = find_customer(&state, &ctx, &lookup).await?;
    Ok(Json(CustomerResponse::from(customer)))
}

/// PATCH /admin/customers/:id - Update the provisioning profile, then mirror it
pub async fn update_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateCustomerBody>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let ctx = request_context("admin", &headers);
    let customer = find_customer(&state, &ctx, &CustomerLookup::from_customer_id(&id)).await?;

    let handler = state.update_customer_handler();
    let result = handler
        .handle(&ctx, customer.id, body.into())
        .instrument(ctx.span("admin_update_customer"))
        .await;
    let updated = state
        .report(&ctx, result)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer"))?;

    Ok(Json(CustomerResponse::from(updated)))
}

/// DELETE /admin/customers/:id - Soft-delete a customer
pub async fn delete_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = request_context("admin", &headers);
    let customer = find_customer(&state, &ctx, &CustomerLookup::from_customer_id(&id)).await?;

    let handler = state.delete_customer_handler();
    let result = handler
        .handle(&ctx, customer.id)
        .instrument(ctx.span("admin_delete_customer"))
        .await;
    if !state.report(&ctx, result).await? {
        return Err(ApiError::not_found("Customer"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn find_customer(
    state: &AppState,
    ctx: &RequestContext,
    lookup: &CustomerLookup,
) -> Result<Customer, ApiError> {
    let result = state
        .get_customer_handler()
        .handle(lookup)
        .instrument(ctx.span("admin_get_customer"))
        .await;
    state
        .report(ctx, result)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer"))
}
