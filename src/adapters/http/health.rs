//! Health endpoint.

use axum::{extract::State, http::StatusCode, Json};

use super::dto::{CheckResult, HealthChecks, HealthResponse};
use super::state::AppState;

/// GET /health - Store and provisioning connectivity, configuration, summary
///
/// Answers 503 when a dependency is unreachable or configuration is
/// incomplete, so load balancers can take the instance out of rotation.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let summary = state.summary_handler().handle().await;
    let provisioning = state.provisioning.ping().await;

    let checks = HealthChecks {
        store: CheckResult::from_result(&summary),
        provisioning: CheckResult::from_result(&provisioning),
    };
    let healthy =
        checks.store.healthy && checks.provisioning.healthy && state.config_presence.is_complete();

    if !healthy {
        tracing::warn!(
            store = checks.store.healthy,
            provisioning = checks.provisioning.healthy,
            configuration = state.config_presence.is_complete(),
            "Health check degraded"
        );
    }

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        checks,
        configuration: state.config_presence,
        subscriptions: summary.ok(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
