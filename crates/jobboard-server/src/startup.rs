//! Server startup utilities.

use crate::app::App;
use jobboard_cache::register_metrics;
use jobboard_config::AppConfig;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{error, info};

/// Installs the Prometheus recorder and describes the cache metrics.
///
/// Returns `None` when metrics are disabled or a recorder is already installed.
pub fn init_metrics(enabled: bool) -> Option<PrometheusHandle> {
    if !enabled {
        info!("Metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_metrics();
            info!("Prometheus metrics recorder installed");
            Some(handle)
        }
        Err(e) => {
            error!("Failed to install metrics recorder: {}", e);
            None
        }
    }
}

/// Logs a readiness summary.
pub fn print_startup_info(config: &AppConfig, app: &App) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Application: {} {}", config.app.name, config.app.version);
    info!("Environment: {}", config.app.environment);
    match config.cache.endpoint() {
        Some(url) if app.cache_enabled() => info!("Cache:       {}", redact(url)),
        _ => info!("Cache:       disabled"),
    }
    info!(
        "Cache TTLs:  list {}s, detail {}s",
        config.cache.list_ttl_secs, config.cache.detail_ttl_secs
    );
    info!("{}", separator);
}

/// Hides the credentials in a Redis URL.
fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    let user = credentials.split_once(':').map_or(credentials, |(user, _)| user);
    format!("{}://{}:***@{}", scheme, user, host)
}
