//! Shared harness for router-level integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use subscription_sync::adapters::alerting::InMemoryAlertNotifier;
use subscription_sync::adapters::http::dto::ConfigPresence;
use subscription_sync::adapters::http::{build_router, AppState, AppStateParts};
use subscription_sync::adapters::memory::{
    InMemoryCustomerRepository, InMemoryPlanMappingRepository, InMemorySubscriptionRepository,
    InMemoryWebhookLogRepository,
};
use subscription_sync::adapters::provisioning::MockProvisioningProvider;
use subscription_sync::adapters::stripe::MockPaymentProvider;
use subscription_sync::application::{ErrorReporter, RetryPolicy};
use subscription_sync::domain::billing::{sign_payload, WebhookVerifier};
use subscription_sync::domain::foundation::Timestamp;
use subscription_sync::domain::sync::PlanMapping;

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";
pub const ADMIN_SECRET: &str = "admin-secret-0123456789";

pub struct TestApp {
    pub router: Router,
    pub customers: Arc<InMemoryCustomerRepository>,
    pub subscriptions: Arc<InMemorySubscriptionRepository>,
    pub ledger: Arc<InMemoryWebhookLogRepository>,
    pub payments: Arc<MockPaymentProvider>,
    pub provisioning: Arc<MockProvisioningProvider>,
    pub alerts: Arc<InMemoryAlertNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        let customers = Arc::new(InMemoryCustomerRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let ledger = Arc::new(InMemoryWebhookLogRepository::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let provisioning = Arc::new(MockProvisioningProvider::new());
        let alerts = Arc::new(InMemoryAlertNotifier::new());
        let plan_mappings = Arc::new(InMemoryPlanMappingRepository::with_mappings(vec![
            PlanMapping::new("stripe", "price_pro_monthly", "pro-hosting-plan"),
            PlanMapping::new("stripe", "price_basic_monthly", "basic-hosting-plan"),
        ]));

        let state = AppState::new(AppStateParts {
            customers: customers.clone(),
            subscriptions: subscriptions.clone(),
            plan_mappings,
            webhook_logs: ledger.clone(),
            payments: payments.clone(),
            provisioning: provisioning.clone(),
            verifier: WebhookVerifier::new(SecretString::new(WEBHOOK_SECRET.to_string())),
            reporter: ErrorReporter::new(alerts.clone()),
            admin_secret: SecretString::new(ADMIN_SECRET.to_string()),
        })
        .with_retry(RetryPolicy::immediate(3))
        .with_sync_concurrency(2)
        .with_config_presence(ConfigPresence {
            database: false,
            payments: true,
            webhook_secret: true,
            provisioning: true,
            admin_secret: true,
        });

        Self {
            router: build_router(state, Duration::from_secs(10)),
            customers,
            subscriptions,
            ledger,
            payments,
            provisioning,
            alerts,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn deliver(&self, event: &Value) -> (StatusCode, Value) {
        self.send(signed_webhook(event)).await
    }

    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(admin_request(method, uri, body, Some(ADMIN_SECRET)))
            .await
    }
}

/// A provider event envelope.
pub fn event(id: &str, event_type: &str, object: Value) -> Value {
    json!({
        "id": id,
        "type": event_type,
        "created": Timestamp::now().as_unix_secs(),
        "livemode": false,
        "data": { "object": object }
    })
}

pub fn checkout_event(id: &str, customer: &str, subscription: &str, price: &str) -> Value {
    event(
        id,
        "checkout.session.completed",
        json!({
            "id": format!("cs_{}", id),
            "customer": customer,
            "subscription": subscription,
            "customer_details": { "email": "jane@example.com", "name": "Jane Doe" },
            "metadata": { "price_id": price }
        }),
    )
}

pub fn subscription_event(id: &str, event_type: &str, subscription: &str, status: &str) -> Value {
    event(
        id,
        event_type,
        json!({ "id": subscription, "customer": "cus_1", "status": status }),
    )
}

pub fn signed_webhook(event: &Value) -> Request<Body> {
    let body = serde_json::to_vec(event).unwrap();
    let signature = sign_payload(WEBHOOK_SECRET, Timestamp::now().as_unix_secs(), &body).unwrap();
    webhook_request(body, Some(&signature))
}

pub fn webhook_request(body: Vec<u8>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn admin_request(
    method: &str,
    uri: &str,
    body: Option<Value>,
    secret: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(secret) = secret {
        builder = builder.header("authorization", format!("Bearer {}", secret));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
