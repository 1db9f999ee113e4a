//! Webhook handlers.
//!
//! Verified intake, idempotent processing, routing to reconciliation
//! handlers and ledger retention.

mod dispatcher;
mod process_webhook;
mod purge_webhook_logs;

pub(crate) use dispatcher::missing_projection;
pub use dispatcher::{EventDispatcher, HandlerOutcome, WebhookEventHandler};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult};
pub use purge_webhook_logs::PurgeWebhookLogsHandler;
