//! Meter Aggregator
//!
//! Standalone worker that recomputes daily usage totals on a fixed interval.
//! Several replicas may run side by side; every run converges on the same
//! totals, so no coordination is needed.

mod config;

use std::net::SocketAddr;

use meter_core::Aggregator;
use meter_db::Storage;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("meter_aggregator=debug".parse()?)
                .add_directive("meter_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Meter Aggregator");

    let config = Config::from_env()?;
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        timeout_secs = config.aggregation_timeout.as_secs(),
        "Configuration loaded"
    );

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        meter_core::metrics::describe_metrics();
        tracing::info!("Metrics listener on {}", addr);
    }

    let pool = meter_db::create_pool_with_options(&config.database_url, &config.pool).await?;
    if config.run_migrations {
        meter_db::run_migrations(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let aggregator = Aggregator::new(Storage::postgres(pool), config.aggregation_timeout);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { aggregator.run(config.interval, shutdown_rx).await });

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    worker.await?;

    tracing::info!("Shutdown complete");
    Ok(())
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

    tracing::info!("Shutdown signal received, stopping aggregator");
}
