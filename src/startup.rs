//! Application startup and lifecycle management.

use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post, Json,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::error::AppError;
use crate::handlers;
use crate::services::{get_metrics, init_metrics, Database, EventPublisher};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Arc<Database>,
    pub events: Arc<EventPublisher>,
}

/// Health check endpoint for liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "rentroll-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "rentroll-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
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

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: Config) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: Config, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        if run_migrations {
            db.run_migrations().await?;
        }

        let events = EventPublisher::new(config.events.collector_url.clone());

        let state = AppState {
            config: config.clone(),
            db: Arc::new(db),
            events: Arc::new(events),
        };

        let address = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&address).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// The port the server is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the server until it is stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(self.listener, router).await
    }
}

/// Assemble the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route(
            "/tenants",
            post(handlers::property::create_tenant).get(handlers::property::list_tenants),
        )
        .route(
            "/tenants/:tenant_id",
            get(handlers::property::get_tenant).delete(handlers::property::delete_tenant),
        )
        .route(
            "/tenants/:tenant_id/payment-state",
            get(handlers::payments::tenant_payment_state),
        )
        .route(
            "/apartments",
            post(handlers::property::create_apartment).get(handlers::property::list_apartments),
        )
        .route(
            "/leases",
            post(handlers::property::create_lease).get(handlers::property::list_leases),
        )
        .route("/billing/generate", post(handlers::billing::generate_bills))
        .route("/billing/periods", get(handlers::billing::list_periods))
        .route("/bills", get(handlers::billing::list_bills))
        .route(
            "/bills/:bill_id",
            get(handlers::billing::get_bill).delete(handlers::billing::delete_bill),
        )
        .route("/payments", post(handlers::payments::record_payment))
        .route("/invoices", get(handlers::payments::list_invoices))
        .route("/invoices/:invoice_id", get(handlers::payments::get_invoice))
        .route(
            "/reports/collection-summary",
            get(handlers::reports::collection_summary),
        )
        .route("/reports/aging", get(handlers::reports::aging_report))
        .route(
            "/reports/overdue-tenants",
            get(handlers::reports::overdue_tenants),
        )
        .route("/audit/events", get(handlers::audit::list_audit_events))
        .layer(axum::middleware::from_fn(
            crate::middleware::metrics::track_requests,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
