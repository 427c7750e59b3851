//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::LogSettings;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}

/// The `RUST_LOG` filter, or the configured level when it is unset.
pub fn env_filter(settings: &LogSettings) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|_| TelemetryError::InvalidFilter(settings.level.clone())),
    }
}

/// Install the global subscriber, as JSON lines when configured.
pub fn init_tracing(settings: &LogSettings) -> Result<(), TelemetryError> {
    let filter = env_filter(settings)?;

    if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInitialized)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInitialized)
    }
}
