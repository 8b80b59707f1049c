//! Meter API
//!
//! HTTP edge for Meterline. Every `/api/v1` request is authenticated from its
//! API key before any body is parsed; the resulting principal is the only
//! source of tenant identity for the call.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/auth/principal` - Organization the key resolves to
//! - `GET /api/v1/organization` - Caller's organization
//! - `POST /api/v1/usage` - Record usage
//! - `GET /api/v1/usage?metric=` - Daily usage totals
//! - `POST /api/v1/invoices` - Generate invoice for a period
//! - `GET /api/v1/invoices` - List invoices
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod extractors;
mod handlers;
mod routes;
mod state;


use std::net::SocketAddr;

use meter_core::Metering;
use meter_db::Storage;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("meter_api=debug".parse()?)
                .add_directive("meter_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Meter API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        aggregation_enabled = config.aggregation_enabled,
        usage_source = %config.metering.usage_source,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool = meter_db::create_pool_with_options(&config.database_url, &config.pool).await?;
    tracing::info!(
        max_connections = config.pool.max_connections,
        "Database pool created"
    );
    if config.run_migrations {
        meter_db::run_migrations(&pool).await?;
        tracing::info!("Migrations applied");
    }

    // Wire the core
    let metering = Metering::new(Storage::postgres(pool), config.metering.clone());

    // Periodic aggregation
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let aggregation = config.aggregation_enabled.then(|| {
        let aggregator = metering.aggregator().clone();
        let interval = config.aggregation_interval;
        tokio::spawn(async move { aggregator.run(interval, shutdown_rx).await })
    });

    let state = AppState::new(std::sync::Arc::new(metering), config.request_timeout);
    let app = build_router(state, metrics_handle);

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    if let Err(e) = run_http_server(app, http_addr).await {
        tracing::error!(error = ?e, "HTTP server error");
    }

    // Stop the aggregator after the server drains
    let _ = shutdown_tx.send(true);
    if let Some(handle) = aggregation {
        if let Err(e) = handle.await {
            tracing::error!(error = ?e, "Aggregator task failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_http_server(app: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Most operations are a single indexed query
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(handlers::shared::OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(meter_core::metrics::AGGREGATION_DURATION_SECONDS.to_string()),
            &[0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0],
        )?;

    let handle = builder.install_recorder()?;

    // Register metrics with descriptions
    meter_core::metrics::describe_metrics();
    metrics::describe_histogram!(
        handlers::shared::OPERATION_DURATION_SECONDS,
        "Handler latency in seconds by operation and result"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
