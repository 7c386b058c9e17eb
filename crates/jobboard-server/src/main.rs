//! # Jobboard Server
//!
//! Loads configuration, wires the job service over the query cache and keeps
//! the cache connection supervised until shutdown.

use jobboard_config::ConfigLoader;
use jobboard_core::telemetry::init_logging;
use jobboard_core::{HealthCheck, JobBoardResult};
use jobboard_server::build_app;
use jobboard_server::startup::{init_metrics, print_startup_info};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(code = e.error_code(), "Application error: {}", e);
        eprintln!("jobboard-server: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> JobBoardResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    init_logging(&config.observability.log_level, config.observability.log_format)?;

    info!("Starting Jobboard server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let metrics = init_metrics(config.observability.metrics_enabled);

    let app = build_app(&config)?;
    let supervisor = app.start();

    print_startup_info(&config, &app);

    shutdown_signal().await;

    app.shutdown();
    if let Some(handle) = supervisor {
        if let Err(e) = handle.await {
            error!("Cache supervisor task failed: {}", e);
        }
    }

    let health = app.cache_health();
    info!("Final {} status: {:?}", health.name(), health.check().await);
    if let Some(handle) = metrics {
        info!("Metrics at shutdown:\n{}", handle.render());
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
