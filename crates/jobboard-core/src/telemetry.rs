//! Logging initialisation.
//!
//! The subscriber itself is only compiled in with the `telemetry` feature so
//! library crates do not pull `tracing-subscriber` into their dependency tree.

#[cfg(feature = "telemetry")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::JobBoardResult;
use serde::{Deserialize, Serialize};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Builds the default filter directive for a base level.
#[must_use]
pub fn default_directive(level: &str) -> String {
    format!("{level},jobboard=debug")
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
#[cfg(feature = "telemetry")]
pub fn init_logging(level: &str, format: LogFormat) -> JobBoardResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
    };

    result.map_err(|e| crate::JobBoardError::Internal(format!("Failed to initialise logging: {}", e)))?;

    tracing::info!(level = %level, format = ?format, "Logging initialized");
    Ok(())
}

/// Placeholder for when the telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_logging(_level: &str, _format: LogFormat) -> JobBoardResult<()> {
    Ok(())
}
