//! Qafka - queue engine daemon
//!
//! Composition root: config, logging, store, metrics exporter and the
//! background loops (liveness sweep, maintenance).

mod config;
mod telemetry;

use anyhow::{Context, Result};
use config::{DaemonConfig, LogFormat};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use qafka_core::application::{shutdown_channel, Engine, EnginePorts, MaintenanceScheduler};
use qafka_core::port::time_provider::SystemTimeProvider;
use qafka_core::port::{MaintenanceConfig, MetricsSink, NoopMetricsSink};
use qafka_infra_metrics::{install_prometheus_exporter, PrometheusMetricsSink};
use qafka_infra_sqlite::{
    create_pool, run_migrations, SqliteMaintenance, SqliteMessageRepository,
    SqliteQueueRepository, SqliteStore, SqliteWorkerRepository,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("qafka=info"))
        .context("Failed to create env filter")?;

    let mut layers: Vec<telemetry::BoxedLayer> = Vec::new();
    layers.push(match format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().boxed(),
        // Development: pretty, coloured
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    });
    if let Some(otel) = telemetry::init_telemetry()? {
        layers.push(otel);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    init_logging(config.log_format)?;

    info!("Qafka v{} starting...", qafka_core::VERSION);

    // 2. Store
    if let Some(dir) = std::path::Path::new(&config.db_path).parent() {
        if !dir.as_os_str().is_empty() && !config.db_path.starts_with("sqlite:") {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }

    info!(db_path = %config.db_path, "Initializing database...");
    let pool = create_pool(&config.database_url())
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Metrics
    let metrics: Arc<dyn MetricsSink> = match config.metrics_port {
        Some(port) => {
            install_prometheus_exporter(SocketAddr::from(([0, 0, 0, 0], port)))
                .context("Metrics exporter failed")?;
            Arc::new(PrometheusMetricsSink::new())
        }
        None => {
            info!("Metrics exporter disabled");
            Arc::new(NoopMetricsSink)
        }
    };

    // 4. Wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let engine = Engine::new(EnginePorts {
        queues: Arc::new(SqliteQueueRepository::new(pool.clone())),
        messages: Arc::new(SqliteMessageRepository::new(pool.clone())),
        workers: Arc::new(SqliteWorkerRepository::new(pool.clone())),
        store: Arc::new(SqliteStore::new(pool.clone())),
        metrics,
        time_provider: time_provider.clone(),
    });

    let queues = engine.queues.list().await.context("Failed to load queues")?;
    info!(queues = queues.len(), "Store ready");

    // 5. Background loops
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let sweeper = engine
        .liveness_sweeper()
        .with_stale_after(config.worker_stale_after)
        .with_sweep_interval(config.sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_tx.subscribe()));

    let maintenance = MaintenanceScheduler::new(
        Arc::new(SqliteMaintenance::new(pool.clone(), time_provider)),
        MaintenanceConfig {
            finished_message_retention_days: config.retention_days,
            ..Default::default()
        },
        config.maintenance_interval,
    );
    let maintenance_handle = tokio::spawn(maintenance.run(shutdown_rx));

    info!("System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    info!("Shutdown signal received. Exiting gracefully...");
    let listening = shutdown_tx.shutdown();
    info!(tasks = listening, "Waiting for background tasks");

    for (name, handle) in [("liveness sweeper", sweeper_handle), ("maintenance", maintenance_handle)] {
        match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task = name, error = %e, "Background task panicked"),
            Err(_) => warn!(task = name, "Background task did not stop in time"),
        }
    }

    pool.close().await;
    telemetry::shutdown_telemetry();
    info!("Shutdown complete.");

    Ok(())
}
