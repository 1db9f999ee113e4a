//! Event dispatcher - routes canonical events to reconciliation handlers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::RequestContext;
use crate::domain::billing::{extract, CanonicalEvent, EventKind, Projections};
use crate::domain::sync::SyncError;

/// What a handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Side effects were applied.
    Applied(String),
    /// Acknowledged without side effects.
    Skipped(String),
}

impl HandlerOutcome {
    pub fn description(&self) -> &str {
        match self {
            HandlerOutcome::Applied(s) | HandlerOutcome::Skipped(s) => s,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, HandlerOutcome::Skipped(_))
    }
}

/// Handler for one or more event kinds.
///
/// Handlers receive the already extracted projections; they never parse
/// provider payloads themselves.
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    /// Returns the event kind(s) this handler processes.
    fn handles(&self) -> Vec<EventKind>;

    async fn handle(
        &self,
        ctx: &RequestContext,
        event: &CanonicalEvent,
        projections: &Projections,
    ) -> Result<HandlerOutcome, SyncError>;
}

/// Routes events to the first registered handler for their kind.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn WebhookEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, handler: Arc<dyn WebhookEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn get_handler(&self, kind: EventKind) -> Option<&Arc<dyn WebhookEventHandler>> {
        self.handlers.iter().find(|h| h.handles().contains(&kind))
    }

    /// Extracts projections and invokes the matching handler.
    ///
    /// Events without a handler, or whose payload projects to nothing,
    /// are skipped, not failed.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        event: &CanonicalEvent,
    ) -> Result<HandlerOutcome, SyncError> {
        let kind = event.kind();
        let Some(handler) = self.get_handler(kind) else {
            return Ok(HandlerOutcome::Skipped(format!(
                "No handler for event type {}",
                event.event_type
            )));
        };

        let projections = extract(event)?;
        if projections.is_empty() {
            return Ok(HandlerOutcome::Skipped(format!(
                "{} event {} has nothing to reconcile",
                event.event_type, event.event_id
            )));
        }
        handler.handle(ctx, event, &projections).await
    }
}

/// Error for a handler invoked without the projection it needs.
pub(crate) fn missing_projection(event: &CanonicalEvent, what: &str) -> SyncError {
    SyncError::business_logic(format!("{} event has no {} projection", event.event_type, what))
        .with_context("event_id", event.event_id.clone())
}
