use drms::analytics::PredictionConfig;
use drms::api::{self, AppState};
use drms::config::Config;
use drms::partition::PartitionManager;
use drms::pool;
use drms::registry::{DisasterFolders, DisasterRegistry};

use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present
    let dotenv_result = dotenvy::dotenv();

    let config = Config::from_env()?;

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!(
            "Warning: Could not create log directory {:?}: {}",
            config.log_dir, e
        );
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "drms.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,drms=debug")))
        // Console output
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        // File output with JSON format for easy parsing
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {:?}", config.log_dir);
    if let Err(e) = dotenv_result {
        warn!("No .env file found or error loading it: {}", e);
    }

    let socket_addr = config.socket_addr()?;

    info!("Starting DRMS on {}", socket_addr);
    info!("Max connections: {}", config.max_connections);
    info!("Disasters root: {:?}", config.disasters_root);
    info!(
        "Table setup: {} attempts, base delay {:?}, DDL lock timeout {:?}",
        config.table_setup_attempts, config.table_setup_base_delay, config.ddl_lock_timeout
    );

    let pool = pool::connect(&config).await?;

    let registry = DisasterRegistry::new(pool.clone(), DisasterFolders::new(&config.disasters_root));
    registry.ensure_table().await?;

    let partitions = PartitionManager::from_config(pool.clone(), &config);
    let prediction = PredictionConfig::from_config(&config);
    info!(
        "Prediction: {}-day horizon, spike z > {}, stable band {}",
        prediction.horizon_days, prediction.z_threshold, prediction.stable_band
    );
    let state = Arc::new(AppState::new(pool, registry, partitions, prediction));

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Received shutdown signal");
}
