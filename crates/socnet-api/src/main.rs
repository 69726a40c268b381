// socnet API server
// Decision: Every pooled connection is opened before the listener binds; a dead primary is fatal
// Decision: Shutdown stops accepting, drains the worker queue, then joins the workers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use socnet_api::api::Health;
use socnet_api::cli::Cli;
use socnet_api::metrics;
use socnet_api::telemetry::{init_logging, LoggingConfig};
use socnet_api::{build_router, AppState, Config, Dispatcher};
use socnet_pool::{Role, TaskQueue, WorkerPool};
use socnet_storage::{Database, PgConnector, StorageBackend};
use tokio::runtime::Handle;

const WORKER_POOL_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&LoggingConfig::from_env());

    let config = Config::from_env();
    config.show();

    let prometheus = metrics::install_recorder()?;
    let metrics_addr = config.prometheus_listening;
    tokio::spawn(async move {
        if let Err(e) = metrics::serve(metrics_addr, prometheus).await {
            tracing::error!(error = %e, "Metrics server failed");
        }
    });

    let workers = Arc::new(
        WorkerPool::new(config.worker_pool_config()).context("Failed to start worker pool")?,
    );

    let storage = open_storage(&cli, &config).await?;
    prepare_schema(&cli, &storage).await?;

    let health = Arc::new(Health::new());
    health.set_live(true);

    let sampler = tokio::spawn(metrics::sample_worker_pool(
        Arc::clone(&workers),
        WORKER_POOL_SAMPLE_INTERVAL,
    ));

    let state = AppState::new(
        storage,
        Dispatcher::new(Arc::clone(&workers)),
        Arc::clone(&health),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.http_listening)
        .await
        .with_context(|| format!("Failed to bind {}", config.http_listening))?;
    tracing::info!("HTTP server listening on {}", config.http_listening);
    health.set_ready(true);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    health.set_ready(false);
    sampler.abort();

    tokio::task::spawn_blocking(move || {
        // Let accepted requests finish before the workers go away
        TaskQueue::shutdown(&*workers);
        workers.shutdown();
        metrics::record_worker_pool(&workers.stats());
    })
    .await
    .context("Worker pool shutdown failed")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn open_storage(cli: &Cli, config: &Config) -> Result<StorageBackend> {
    if cli.dev_mode {
        tracing::warn!("Dev mode: serving from the in-memory store, data is not persisted");
        return Ok(StorageBackend::in_memory());
    }

    let primary = config.primary_node().context("Invalid PGSQL_ENDPOINT")?;
    let replicas = config
        .replica_nodes()
        .context("Invalid PGSQL_REPLICA_ENDPOINTS")?;
    let settings = config.pool_settings();
    let connector = PgConnector::new(Handle::current());

    // Pool construction blocks on the runtime handle, so it runs off the runtime
    let database = tokio::task::spawn_blocking(move || {
        Database::connect(connector, vec![primary], replicas, settings)
    })
    .await
    .context("Database connect task failed")?
    .context("Failed to connect to database")?;

    tracing::info!(
        primaries = database.pool().node_count(Role::Primary),
        replicas = database.pool().node_count(Role::Replica),
        pool_size = database.pool().settings().pool_size,
        "Connected to database"
    );
    Ok(StorageBackend::Postgres(database))
}

/// Apply `--bootstrap-schema`, then `--index-drop`, then `--index-add`
///
/// Migration failures are fatal; index changes are best effort.
async fn prepare_schema(cli: &Cli, storage: &StorageBackend) -> Result<()> {
    let cli = cli.clone();
    let storage = storage.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        if cli.bootstrap_schema {
            storage
                .run_migrations()
                .context("Failed to apply database migrations")?;
            tracing::info!("Database schema is up to date");
        }

        for index in &cli.index_drop {
            match storage.drop_index(*index) {
                Ok(()) => tracing::info!(index = %index, "Index dropped"),
                Err(e) => tracing::error!(index = %index, error = %e, "Failed to drop index"),
            }
        }
        for index in &cli.index_add {
            match storage.create_index(*index) {
                Ok(()) => tracing::info!(index = %index, "Index created"),
                Err(e) => tracing::error!(index = %index, error = %e, "Failed to create index"),
            }
        }
        Ok(())
    })
    .await
    .context("Schema task failed")?
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal");
}
