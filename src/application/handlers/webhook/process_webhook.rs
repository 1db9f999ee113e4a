//! ProcessWebhookHandler - Verified, idempotent webhook intake.
//!
//! The processor follows these steps:
//! 1. Verify the signature and build the canonical event
//! 2. Record the event in the ledger (insert-or-reject)
//! 3. Advance to `processing` and dispatch to the reconciliation handler
//! 4. Advance to `success`, or to `error` with the failure message
//!
//! ## Race Condition Handling
//!
//! When multiple deliveries of one event arrive simultaneously, the first
//! to insert its ledger key wins. The others get `AlreadyExists` and
//! return `AlreadyProcessed` without side effects.

use std::sync::Arc;

use tracing::Instrument;

use super::dispatcher::{EventDispatcher, HandlerOutcome};
use crate::application::{with_retry, ErrorReporter, RequestContext, RetryPolicy};
use crate::domain::billing::{CanonicalEvent, WebhookVerifier};
use crate::domain::sync::{SyncError, WebhookLog, WebhookStatus};
use crate::ports::{RecordOutcome, WebhookLogRepository};

/// Command carrying one inbound delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw request body, exactly as signed.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header, if present.
    pub signature: Option<String>,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessWebhookResult {
    Processed {
        event_id: String,
        outcome: HandlerOutcome,
    },
    /// The ledger already held this event; nothing was done.
    AlreadyProcessed { event_id: String },
}

/// Handler for inbound payments webhooks.
pub struct ProcessWebhookHandler {
    verifier: Arc<WebhookVerifier>,
    ledger: Arc<dyn WebhookLogRepository>,
    dispatcher: EventDispatcher,
    reporter: ErrorReporter,
    retry: RetryPolicy,
}

impl ProcessWebhookHandler {
    pub fn new(
        verifier: Arc<WebhookVerifier>,
        ledger: Arc<dyn WebhookLogRepository>,
        dispatcher: EventDispatcher,
        reporter: ErrorReporter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            verifier,
            ledger,
            dispatcher,
            reporter,
            retry,
        }
    }

    pub async fn handle(
        &self,
        ctx: &RequestContext,
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, SyncError> {
        let span = ctx.span("process_webhook");
        async {
            let result = self.process(ctx, cmd).await;
            if let Err(err) = &result {
                self.reporter.report(ctx, err).await;
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        ctx: &RequestContext,
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, SyncError> {
        // 1. Verify signature and parse event
        let event = self
            .verifier
            .verify(&cmd.payload, cmd.signature.as_deref())?;
        let key = event.idempotency_key();

        // 2. Record in the ledger; a duplicate short-circuits
        let entry = WebhookLog::received(
            key.as_str(),
            event.provider.as_str(),
            event.event_type.as_str(),
            event.raw.clone(),
        );
        let ledger = &self.ledger;
        let entry_ref = &entry;
        let outcome = with_retry(&self.retry, "record_webhook", move || {
            ledger.record(entry_ref)
        })
        .await?;

        if outcome == RecordOutcome::AlreadyExists {
            tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                "Duplicate webhook delivery, already processed"
            );
            return Ok(ProcessWebhookResult::AlreadyProcessed {
                event_id: event.event_id,
            });
        }

        // 3. Dispatch
        self.advance(&key, WebhookStatus::Processing, None).await?;
        match self.dispatcher.dispatch(ctx, &event).await {
            Ok(outcome) => {
                self.log_outcome(&event, &outcome);
                self.advance(&key, WebhookStatus::Success, None).await?;
                Ok(ProcessWebhookResult::Processed {
                    event_id: event.event_id,
                    outcome,
                })
            }
            Err(err) => {
                if let Err(ledger_err) = self
                    .advance(&key, WebhookStatus::Error, Some(&err.message))
                    .await
                {
                    tracing::error!(
                        idempotency_key = %key,
                        error = %ledger_err,
                        "Failed to record webhook failure in ledger"
                    );
                }
                Err(err
                    .with_context("event_id", event.event_id.clone())
                    .with_context("event_type", event.event_type.clone()))
            }
        }
    }

    async fn advance(
        &self,
        key: &str,
        status: WebhookStatus,
        error_message: Option<&str>,
    ) -> Result<(), SyncError> {
        let ledger = &self.ledger;
        with_retry(&self.retry, "advance_webhook", move || {
            ledger.advance(key, status, error_message)
        })
        .await
    }

    fn log_outcome(&self, event: &CanonicalEvent, outcome: &HandlerOutcome) {
        match outcome {
            HandlerOutcome::Applied(what) => tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                "Webhook applied: {}",
                what
            ),
            HandlerOutcome::Skipped(why) => tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                "Webhook skipped: {}",
                why
            ),
        }
    }
}
