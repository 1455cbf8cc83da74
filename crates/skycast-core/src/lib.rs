//! Shared plumbing for Skycast: configuration, logging and the
//! key-value persistence layer the weather stores sit on.

pub mod config;
pub mod storage;

pub use config::{
    Config, ConfigIssue, LoggingConfig, RecentsConfig, Severity, ValidationResult, WeatherConfig,
};
pub use storage::{KeyValueStore, SqliteStore, StorageError};

use anyhow::Result;

/// Initialize tracing/logging.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
        return Ok(());
    }

    tracing::info!("Skycast core initialized");
    Ok(())
}
