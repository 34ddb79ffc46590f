//! Structured logging setup using tracing.
//!
//! Installs a global `tracing-subscriber` registry: an `EnvFilter` taken
//! from `RUST_LOG` (or the configured level when unset) and a fmt layer
//! emitting either human-readable lines or flattened JSON.

use calsync_domain::{CalSyncError, LogConfig, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber.
///
/// Calling this again once a subscriber is installed is a no-op.
///
/// # Errors
/// Returns `CalSyncError::Config` if neither `RUST_LOG` nor the configured
/// level is a valid filter directive.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter_layer = build_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .flatten_event(true),
            )
            .with(filter_layer)
            .try_init()
    } else {
        tracing_subscriber::registry().with(fmt::layer().with_target(true)).with(filter_layer).try_init()
    };

    match installed {
        Ok(()) => tracing::info!(level = %config.level, json = config.json, "Logging initialized"),
        Err(e) => tracing::debug!(error = %e, "tracing subscriber already installed"),
    }

    Ok(())
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CalSyncError::Config(format!("invalid log filter '{}': {}", config.level, e)))
}
