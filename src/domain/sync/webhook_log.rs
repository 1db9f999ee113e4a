//! Webhook ledger entries.
//!
//! The ledger enforces at-most-once side-effect application: the
//! idempotency key is written exactly once, and the status only moves
//! forward through `received -> processing -> success | error`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Timestamp;

/// Builds the ledger key for a provider event.
pub fn idempotency_key(provider: &str, event_id: &str) -> String {
    format!("{}:{}", provider, event_id)
}

/// Lifecycle status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Received,
    Processing,
    Success,
    Error,
}

impl WebhookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookStatus::Received => "received",
            WebhookStatus::Processing => "processing",
            WebhookStatus::Success => "success",
            WebhookStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(WebhookStatus::Received),
            "processing" => Some(WebhookStatus::Processing),
            "success" => Some(WebhookStatus::Success),
            "error" => Some(WebhookStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WebhookStatus::Success | WebhookStatus::Error)
    }

    /// Whether an entry in `self` may move to `next`.
    ///
    /// A terminal entry may only be re-written with its own status, which
    /// lets callers annotate the error message.
    pub fn can_transition_to(&self, next: WebhookStatus) -> bool {
        use WebhookStatus::*;
        match (self, next) {
            (Received, Processing) => true,
            (Processing, Success) | (Processing, Error) => true,
            (Success, Success) | (Error, Error) => true,
            _ => false,
        }
    }

    /// Statuses from which `self` can be reached.
    pub fn allowed_predecessors(&self) -> Vec<WebhookStatus> {
        use WebhookStatus::*;
        [Received, Processing, Success, Error]
            .into_iter()
            .filter(|from| from.can_transition_to(*self))
            .collect()
    }
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookLog {
    pub idempotency_key: String,
    pub source: String,
    pub event_type: String,
    pub status: WebhookStatus,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

impl WebhookLog {
    /// A freshly received entry.
    pub fn received(
        idempotency_key: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            source: source.into(),
            event_type: event_type.into(),
            status: WebhookStatus::Received,
            payload,
            error_message: None,
            created_at: Timestamp::now(),
        }
    }
}
