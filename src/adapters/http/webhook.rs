//! Payments webhook intake endpoint.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use super::dto::WebhookAck;
use super::error::ApiError;
use super::request_context;
use super::state::AppState;
use crate::application::handlers::webhook::{ProcessWebhookCommand, ProcessWebhookResult};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /webhooks/stripe - Verify, record and reconcile one event
///
/// Redeliveries of an already recorded event are acknowledged the same
/// way as first deliveries.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let ctx = request_context("webhook", &headers);
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handler = state.process_webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match handler.handle(&ctx, cmd).await? {
        ProcessWebhookResult::Processed { event_id, outcome } => {
            tracing::debug!(
                request_id = %ctx.request_id,
                event_id = %event_id,
                skipped = outcome.is_skipped(),
                "Webhook acknowledged"
            );
        }
        ProcessWebhookResult::AlreadyProcessed { event_id } => {
            tracing::debug!(
                request_id = %ctx.request_id,
                event_id = %event_id,
                "Duplicate webhook acknowledged"
            );
        }
    }

    Ok(Json(WebhookAck { received: true }))
}
