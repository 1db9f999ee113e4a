//! Subscription Sync server
//!
//! Loads configuration, wires adapters to the application handlers and
//! serves the webhook, admin and health endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_sync::adapters::alerting::TracingAlertNotifier;
use subscription_sync::adapters::http::dto::ConfigPresence;
use subscription_sync::adapters::http::{build_router, AppState, AppStateParts};
use subscription_sync::adapters::memory::{
    InMemoryCustomerRepository, InMemoryPlanMappingRepository, InMemorySubscriptionRepository,
    InMemoryWebhookLogRepository,
};
use subscription_sync::adapters::plan_mapping_seed::seed_plan_mappings;
use subscription_sync::adapters::postgres::{
    PostgresCustomerRepository, PostgresPlanMappingRepository, PostgresSubscriptionRepository,
    PostgresWebhookLogRepository,
};
use subscription_sync::adapters::provisioning::{self, HttpProvisioningAdapter};
use subscription_sync::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use subscription_sync::application::handlers::webhook::PurgeWebhookLogsHandler;
use subscription_sync::application::{ErrorReporter, RequestContext};
use subscription_sync::config::{AppConfig, DatabaseConfig, LogFormat, StoreBackend};
use subscription_sync::domain::billing::WebhookVerifier;
use subscription_sync::ports::{
    CustomerRepository, PlanMappingRepository, SubscriptionRepository, WebhookLogRepository,
};

const PURGE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

struct Stores {
    customers: Arc<dyn CustomerRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    plan_mappings: Arc<dyn PlanMappingRepository>,
    webhook_logs: Arc<dyn WebhookLogRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        log_format = ?config.server.log_format,
        "Starting subscription sync"
    );

    let stores = connect_stores(&config.database).await?;

    if let Some(path) = &config.sync.plan_mappings_path {
        let seeded = seed_plan_mappings(stores.plan_mappings.as_ref(), path)
            .await
            .with_context(|| format!("Failed to seed plan mappings from {}", path))?;
        info!(count = seeded, path = %path, "Seeded plan mappings");
    }

    let payments = StripePaymentAdapter::new(
        StripeConfig::new(config.payment.api_key()).with_base_url(&config.payment.api_base_url),
    );
    let provisioning = HttpProvisioningAdapter::new(
        provisioning::ProvisioningConfig::new(
            &config.provisioning.api_url,
            config.provisioning.api_token(),
        )
        .with_timeout(config.provisioning.timeout()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build provisioning client: {}", e))?;

    let verifier = WebhookVerifier::new(config.payment.webhook_secret())
        .with_tolerance(config.payment.webhook_tolerance_secs as i64);

    spawn_purge_task(stores.webhook_logs.clone(), config.sync.webhook_retention_days);

    let state = AppState::new(AppStateParts {
        customers: stores.customers,
        subscriptions: stores.subscriptions,
        plan_mappings: stores.plan_mappings,
        webhook_logs: stores.webhook_logs,
        payments: Arc::new(payments),
        provisioning: Arc::new(provisioning),
        verifier,
        reporter: ErrorReporter::new(Arc::new(TracingAlertNotifier::new())),
        admin_secret: config.admin.api_secret(),
    })
    .with_retry(config.sync.retry_policy())
    .with_sync_concurrency(config.sync.concurrency)
    .with_config_presence(ConfigPresence::from(&config));

    if let Some(every) = config.sync.interval() {
        spawn_sync_task(state.clone(), every);
    }

    let app = build_router(state, config.server.request_timeout());
    let addr = config
        .server
        .listen_addr()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_filter));

    if config.server.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn connect_stores(database: &DatabaseConfig) -> anyhow::Result<Stores> {
    let store = match database.backend() {
        StoreBackend::InMemory => {
            tracing::warn!("No database configured, using in-memory stores");
            return Ok(Stores {
                customers: Arc::new(InMemoryCustomerRepository::new()),
                subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
                plan_mappings: Arc::new(InMemoryPlanMappingRepository::new()),
                webhook_logs: Arc::new(InMemoryWebhookLogRepository::new()),
            });
        }
        StoreBackend::Postgres(store) => store,
    };

    info!(pool_size = store.pool_size, "Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(store.pool_size)
        .acquire_timeout(store.acquire_timeout)
        .connect(store.url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connection established");

    if store.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        info!("Database migrations applied");
    }

    Ok(Stores {
        customers: Arc::new(PostgresCustomerRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        plan_mappings: Arc::new(PostgresPlanMappingRepository::new(pool.clone())),
        webhook_logs: Arc::new(PostgresWebhookLogRepository::new(pool)),
    })
}

/// Purges old ledger entries once a day.
fn spawn_purge_task(ledger: Arc<dyn WebhookLogRepository>, retention_days: i64) {
    tokio::spawn(async move {
        let handler = PurgeWebhookLogsHandler::new(ledger, retention_days);
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let ctx = RequestContext::new("retention");
            if let Err(err) = handler.handle(&ctx).await {
                tracing::error!(
                    request_id = %ctx.request_id,
                    error = %err,
                    "Webhook ledger purge failed"
                );
            }
        }
    });
}

/// Periodic bulk sync, independent of webhook delivery.
fn spawn_sync_task(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; skip it so startup is not a sweep.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let ctx = RequestContext::new("scheduler");
            let result = state.sync_handler().sync_all(&ctx).await;
            match state.report(&ctx, result).await {
                Ok(summary) => info!(
                    request_id = %ctx.request_id,
                    synced = summary.synced,
                    errors = summary.errors.len(),
                    "Scheduled sync finished"
                ),
                Err(err) => tracing::error!(
                    request_id = %ctx.request_id,
                    error = %err,
                    "Scheduled sync failed"
                ),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
