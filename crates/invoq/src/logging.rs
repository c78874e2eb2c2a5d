//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// `RUST_LOG` when set, else the configured filter.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ConfigError::Logging(format!("invalid filter '{}': {}", config.filter, e)))
}

/// Installs the global subscriber. `log` records from the database layer
/// are forwarded into it. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_filter(config)?;

    let result = if config.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
