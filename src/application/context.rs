//! Per-invocation request context.

use uuid::Uuid;

/// Identifies one inbound invocation (webhook delivery, admin call, sweep).
///
/// Passed explicitly to every handler; handlers open their tracing span
/// from it instead of relying on any global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub source: String,
}

impl RequestContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            source: source.into(),
        }
    }

    /// Reuses an upstream request id (e.g. from `x-request-id`).
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Opens a span for `operation` tagged with this context.
    pub fn span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!(
            "sync",
            request_id = %self.request_id,
            source = %self.source,
            operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_contexts_have_distinct_ids() {
        let a = RequestContext::new("webhook");
        let b = RequestContext::new("webhook");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn with_request_id_overrides() {
        let id = Uuid::new_v4();
        let ctx = RequestContext::new("admin").with_request_id(id);
        assert_eq!(ctx.request_id, id);
        assert_eq!(ctx.source, "admin");
    }
}
