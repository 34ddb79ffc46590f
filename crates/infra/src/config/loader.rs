//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CALSYNC_DB_PATH` is not set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. With no file anywhere, the built-in defaults apply
//!
//! ## Environment Variables
//! - `CALSYNC_DB_PATH`: Database file path (required for env loading)
//! - `CALSYNC_DB_POOL_SIZE`: Connection pool size
//! - `CALSYNC_SYNC_LOOKBACK_DAYS` / `CALSYNC_SYNC_LOOKAHEAD_DAYS`: Sync window
//! - `CALSYNC_SYNC_MAX_PAGES`: Page limit per fetch
//! - `CALSYNC_PROVIDER_BASE_URL`: Graph API base URL
//! - `CALSYNC_PROVIDER_PAGE_SIZE`: Preferred page size
//! - `CALSYNC_PROVIDER_TIMEOUT_SECS`: Per-request timeout
//! - `CALSYNC_PROVIDER_MAX_ATTEMPTS`: Attempts per request, retries included
//! - `CALSYNC_LOG_LEVEL`: Default log filter
//! - `CALSYNC_LOG_JSON`: Emit JSON logs (true/false)
//!
//! Optional variables fall back to their defaults when unset.
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./config.toml` or `./config.json` (current working directory)
//! 2. `./calsync.toml` or `./calsync.json` (current working directory)
//! 3. `../config.toml` or `../config.json` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use calsync_domain::{CalSyncError, Config, Result};

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CalSyncError::Config` if an environment value or a discovered
/// file is invalid.
pub fn load() -> Result<Config> {
    if std::env::var_os("CALSYNC_DB_PATH").is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    tracing::debug!("CALSYNC_DB_PATH not set, trying file");
    match discover_config_path() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No config file found; using defaults");
            Ok(Config::default())
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `CalSyncError::Config` if `CALSYNC_DB_PATH` is missing or any
/// set variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("CALSYNC_DB_PATH")?;
    config.database.pool_size = env_parse("CALSYNC_DB_POOL_SIZE", config.database.pool_size)?;

    config.sync.lookback_days = env_parse("CALSYNC_SYNC_LOOKBACK_DAYS", config.sync.lookback_days)?;
    config.sync.lookahead_days =
        env_parse("CALSYNC_SYNC_LOOKAHEAD_DAYS", config.sync.lookahead_days)?;
    config.sync.max_pages = env_parse("CALSYNC_SYNC_MAX_PAGES", config.sync.max_pages)?;

    if let Ok(base_url) = std::env::var("CALSYNC_PROVIDER_BASE_URL") {
        config.provider.base_url = base_url;
    }
    config.provider.page_size = env_parse("CALSYNC_PROVIDER_PAGE_SIZE", config.provider.page_size)?;
    config.provider.timeout_secs =
        env_parse("CALSYNC_PROVIDER_TIMEOUT_SECS", config.provider.timeout_secs)?;
    config.provider.max_attempts =
        env_parse("CALSYNC_PROVIDER_MAX_ATTEMPTS", config.provider.max_attempts)?;

    if let Ok(level) = std::env::var("CALSYNC_LOG_LEVEL") {
        config.log.level = level;
    }
    config.log.json = env_bool("CALSYNC_LOG_JSON", config.log.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Format is detected by file extension.
///
/// # Errors
/// Returns `CalSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CalSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => discover_config_path().ok_or_else(|| {
            CalSyncError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CalSyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CalSyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CalSyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CalSyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Returns the first config file found, or `None` if no file exists.
pub fn discover_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
        candidates.extend([cwd.join("../config.toml"), cwd.join("../config.json")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("config.toml"),
        dir.join("config.json"),
        dir.join("calsync.toml"),
        dir.join("calsync.json"),
    ]
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CalSyncError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional variable, keeping `default` when it is unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| CalSyncError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
