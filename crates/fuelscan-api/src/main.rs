//! fuelscan HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fuelscan_core::defaults::SERVER_PORT;
use fuelscan_core::{ExtractionBackend, JobRepository, ResultRepository};
use fuelscan_db::{Database, MemoryStore, PoolConfig};
use fuelscan_inference::GeminiBackend;
use fuelscan_jobs::{QueueTicker, Scheduler, SchedulerConfig, TickerConfig};

use fuelscan_api::{router, AppState};

/// Install the global subscriber.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `LOG_FORMAT` | `text` | `json` for one JSON object per event |
/// | `LOG_FILE` | unset | Also roll logs daily into this file instead of stdout |
/// | `LOG_ANSI` | auto | Force colors on or off |
/// | `RUST_LOG` | see below | Standard env filter |
///
/// The returned guard flushes the file writer on drop and must outlive `main`.
fn init_logging() -> (String, Option<String>, Option<WorkerGuard>) {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");
    let json = log_format == "json";

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "fuelscan_api=debug,fuelscan_jobs=debug,fuelscan_inference=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    let Some(path) = log_file.clone() else {
        if json {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        return (log_format, log_file, None);
    };

    let path = std::path::Path::new(&path);
    let dir = path.parent().unwrap_or(std::path::Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("fuelscan-api.log");
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(log_ansi.unwrap_or(false)),
            )
            .init();
    }
    (log_format, log_file, Some(guard))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let (log_format, log_file, _log_guard) = init_logging();
    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // FUELSCAN_STORE=memory runs without PostgreSQL; state is lost on exit.
    let store_kind = std::env::var("FUELSCAN_STORE").unwrap_or_else(|_| "postgres".to_string());
    let (jobs, results): (Arc<dyn JobRepository>, Arc<dyn ResultRepository>) =
        if store_kind == "memory" {
            info!(subsystem = "api", store = "memory", "Using in-memory store");
            let store = Arc::new(MemoryStore::new());
            let jobs: Arc<dyn JobRepository> = store.clone();
            let results: Arc<dyn ResultRepository> = store;
            (jobs, results)
        } else {
            let database_url = std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
            let db = Database::connect_with_config(&database_url, PoolConfig::from_env()).await?;
            db.migrate().await?;
            info!(subsystem = "api", store = "postgres", "Migrations applied");
            let jobs: Arc<dyn JobRepository> = Arc::new(db.jobs);
            let results: Arc<dyn ResultRepository> = Arc::new(db.results);
            (jobs, results)
        };

    let backend: Arc<dyn ExtractionBackend> = Arc::new(GeminiBackend::from_env()?);
    let scheduler_config = SchedulerConfig::from_env();
    info!(
        subsystem = "api",
        model = backend.model_name(),
        max_attempts = scheduler_config.max_attempts,
        timeout_ms = scheduler_config.timeout_ms,
        throttle_ms = scheduler_config.throttle_ms,
        zero_backoff = scheduler_config.zero_backoff,
        "Scheduler configured"
    );
    let scheduler = Scheduler::new(jobs.clone(), results.clone(), backend, &scheduler_config);

    let ticker_config = TickerConfig::from_env();
    let ticker = if ticker_config.enabled {
        Some(QueueTicker::new(scheduler.clone(), ticker_config).start())
    } else {
        info!(subsystem = "api", "Queue ticker disabled; use /api/process-queue");
        None
    };

    let app = router(AppState::new(jobs, results, scheduler));

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(SERVER_PORT);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(ticker) = ticker {
        info!(subsystem = "api", "Stopping queue ticker");
        ticker.stop().await;
    }
    served?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received, draining");
}
