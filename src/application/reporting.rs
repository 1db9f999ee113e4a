//! Severity-aware error reporting.

use std::sync::Arc;

use super::context::RequestContext;
use crate::domain::sync::{ErrorSeverity, SyncError};
use crate::ports::AlertNotifier;

/// Logs classified errors and escalates critical ones.
#[derive(Clone)]
pub struct ErrorReporter {
    notifier: Arc<dyn AlertNotifier>,
}

impl ErrorReporter {
    pub fn new(notifier: Arc<dyn AlertNotifier>) -> Self {
        Self { notifier }
    }

    pub async fn report(&self, ctx: &RequestContext, error: &SyncError) {
        let category = error.category.code();
        let severity = error.severity.as_str();
        let context = format!("{:?}", error.context);

        match error.severity {
            ErrorSeverity::Low => tracing::info!(
                request_id = %ctx.request_id,
                category,
                severity,
                retryable = error.retryable,
                context,
                "{}",
                error.message
            ),
            ErrorSeverity::Medium => tracing::warn!(
                request_id = %ctx.request_id,
                category,
                severity,
                retryable = error.retryable,
                context,
                "{}",
                error.message
            ),
            ErrorSeverity::High | ErrorSeverity::Critical => tracing::error!(
                request_id = %ctx.request_id,
                category,
                severity,
                retryable = error.retryable,
                context,
                "{}",
                error.message
            ),
        }

        if error.is_critical() {
            self.notifier.notify_critical(error).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::alerting::InMemoryAlertNotifier;

    #[tokio::test]
    async fn critical_errors_are_alerted() {
        let notifier = Arc::new(InMemoryAlertNotifier::new());
        let reporter = ErrorReporter::new(notifier.clone());
        let ctx = RequestContext::new("test");

        reporter
            .report(&ctx, &SyncError::system("disk full").with_severity(ErrorSeverity::Critical))
            .await;

        assert_eq!(notifier.alerts().await, vec!["disk full".to_string()]);
    }

    #[tokio::test]
    async fn non_critical_errors_are_not_alerted() {
        let notifier = Arc::new(InMemoryAlertNotifier::new());
        let reporter = ErrorReporter::new(notifier.clone());
        let ctx = RequestContext::new("test");

        reporter.report(&ctx, &SyncError::database("timeout")).await;
        reporter.report(&ctx, &SyncError::validation("bad")).await;

        assert!(notifier.alerts().await.is_empty());
    }
}
