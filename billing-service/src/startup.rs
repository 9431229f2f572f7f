//! Application startup and lifecycle management.

use crate::config::BillingConfig;
use crate::handlers;
use crate::models::default_catalog;
use crate::services::providers::{MockGateway, MockNotifier};
use crate::services::{get_metrics, BillingEngine, BillingStore, MemoryStore, PgStore, Scheduler};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub store: Arc<dyn BillingStore>,
    pub engine: Arc<BillingEngine>,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<MockNotifier>,
}

/// State for health check endpoints.
#[derive(Clone)]
struct HealthState {
    store: Arc<dyn BillingStore>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "billing-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "billing-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Readiness check passed");
            StatusCode::OK
        }
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = get_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Seed the default plan catalog. Idempotent by plan name.
async fn seed_default_plans(store: &dyn BillingStore) -> Result<(), AppError> {
    for plan in default_catalog() {
        if store.get_plan_by_name(&plan.name).await?.is_some() {
            continue;
        }
        match store.create_plan(&plan).await {
            Ok(created) => {
                tracing::info!(plan = %created.name, price = %created.price, "Seeded plan");
            }
            // Another instance seeded it between the check and the insert.
            Err(AppError::BadRequest(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        let store: Arc<dyn BillingStore> = match &config.database {
            Some(database) => {
                let store = PgStore::connect(
                    &database.url,
                    database.max_connections,
                    database.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;
                store.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        seed_default_plans(store.as_ref()).await?;

        let gateway = Arc::new(MockGateway::new(config.payment.success_rate));
        let notifier = Arc::new(MockNotifier::new());
        let engine = Arc::new(BillingEngine::new(
            store.clone(),
            gateway.clone(),
            notifier.clone(),
        ));

        let state = AppState {
            config: config.clone(),
            store,
            engine,
            gateway,
            notifier,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Billing service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a handle to the billing engine.
    pub fn engine(&self) -> Arc<BillingEngine> {
        self.state.engine.clone()
    }

    /// Get a handle to the store.
    pub fn store(&self) -> Arc<dyn BillingStore> {
        self.state.store.clone()
    }

    /// Get a handle to the payment gateway.
    pub fn gateway(&self) -> Arc<MockGateway> {
        self.state.gateway.clone()
    }

    /// Get a handle to the reminder notifier.
    pub fn notifier(&self) -> Arc<MockNotifier> {
        self.state.notifier.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let health_state = HealthState {
            store: self.state.store.clone(),
        };

        let health_router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_handler))
            .with_state(health_state);

        let api_router = Router::new()
            .route("/users", post(handlers::users::create_user))
            .route("/users/:id", get(handlers::users::get_user))
            .route("/plans", get(handlers::plans::list_plans))
            .route(
                "/users/:id/subscriptions",
                post(handlers::subscriptions::create_subscription)
                    .get(handlers::subscriptions::list_user_subscriptions),
            )
            .route(
                "/subscriptions/:id",
                delete(handlers::subscriptions::cancel_subscription),
            )
            .route(
                "/users/:id/invoices",
                get(handlers::invoices::list_user_invoices),
            )
            .route("/invoices/:id", get(handlers::invoices::get_invoice))
            .route("/invoices/:id/pay", post(handlers::invoices::pay_invoice))
            .with_state(self.state.clone());

        let router = api_router
            .merge(health_router)
            .layer(middleware::from_fn(metrics_middleware))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            );

        if self.state.config.scheduler.enabled {
            let scheduler = Arc::new(Scheduler::new(
                self.state.engine.clone(),
                self.state.config.scheduler.hour_utc,
            ));
            scheduler.spawn();
        } else {
            tracing::debug!("Scheduler disabled");
        }

        tracing::info!(
            service = "billing-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await
    }
}
