//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to loading a file
//! 3. Probes a handful of paths for config files
//! 4. Supports TOML and JSON formats (detected by extension)
//!
//! ## Environment Variables
//! - `GATHER_DB_PATH` (required): database file path
//! - `GATHER_SYSTEM_OWNER` (required): owner id for scraper calendars
//! - `GATHER_DB_POOL_SIZE`, `GATHER_HTTP_TIMEOUT`, `GATHER_USER_AGENT`
//! - `GATHER_SWEEP_CRON`, `GATHER_DEDUP_SWEEP_CRON`, `GATHER_WORKERS`
//! - `GATHER_MAX_ATTEMPTS`, `GATHER_EXTRACT_MAX_ATTEMPTS`,
//!   `GATHER_STAGGER_MAX_SECONDS`
//! - `GATHER_EXTRACT_API_URL`, `GATHER_EXTRACT_API_KEY`,
//!   `GATHER_EXTRACT_TIMEOUT`

use std::path::{Path, PathBuf};

use gather_domain::{
    Config, DatabaseConfig, ExtractConfig, GatherError, HttpConfig, IngestConfig, Result,
    SchedulerConfig,
};
use tracing::{debug, info};

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns `Config` errors when neither source yields a usable
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            debug!(error = ?e, "environment configuration incomplete, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// `GATHER_DB_PATH` and `GATHER_SYSTEM_OWNER` are required; everything else
/// falls back to defaults.
///
/// # Errors
/// Returns `Config` when a required variable is missing or a value fails to
/// parse.
pub fn load_from_env() -> Result<Config> {
    let db_path = required_var("GATHER_DB_PATH")?;
    let system_owner = required_var("GATHER_SYSTEM_OWNER")?;

    let http_defaults = HttpConfig::default();
    let scheduler_defaults = SchedulerConfig::default();
    let extract_defaults = ExtractConfig::default();

    Ok(Config {
        database: DatabaseConfig {
            path: db_path,
            pool_size: parsed_var("GATHER_DB_POOL_SIZE", 4)?,
        },
        http: HttpConfig {
            timeout_seconds: parsed_var("GATHER_HTTP_TIMEOUT", http_defaults.timeout_seconds)?,
            user_agent: string_var("GATHER_USER_AGENT", &http_defaults.user_agent),
        },
        scheduler: SchedulerConfig {
            sweep_cron: string_var("GATHER_SWEEP_CRON", &scheduler_defaults.sweep_cron),
            dedup_sweep_cron: string_var(
                "GATHER_DEDUP_SWEEP_CRON",
                &scheduler_defaults.dedup_sweep_cron,
            ),
            workers: parsed_var("GATHER_WORKERS", scheduler_defaults.workers)?,
            max_attempts: parsed_var("GATHER_MAX_ATTEMPTS", scheduler_defaults.max_attempts)?,
            extract_max_attempts: parsed_var(
                "GATHER_EXTRACT_MAX_ATTEMPTS",
                scheduler_defaults.extract_max_attempts,
            )?,
            stagger_max_seconds: parsed_var(
                "GATHER_STAGGER_MAX_SECONDS",
                scheduler_defaults.stagger_max_seconds,
            )?,
        },
        extract: ExtractConfig {
            api_url: string_var("GATHER_EXTRACT_API_URL", &extract_defaults.api_url),
            api_key: std::env::var("GATHER_EXTRACT_API_KEY").ok(),
            timeout_seconds: parsed_var(
                "GATHER_EXTRACT_TIMEOUT",
                extract_defaults.timeout_seconds,
            )?,
        },
        ingest: IngestConfig { system_owner },
    })
}

/// Load configuration from a file, probing default locations when no path
/// is given.
///
/// # Errors
/// Returns `Config` when no file is found or the contents fail to parse.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths().ok_or_else(|| {
            GatherError::Config("no configuration file found in probe paths".into())
        })?,
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        GatherError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| GatherError::Config(format!("invalid TOML config: {e}")))?,
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| GatherError::Config(format!("invalid JSON config: {e}")))?,
        other => {
            return Err(GatherError::Config(format!(
                "unsupported config format: {other:?}"
            )))
        }
    };

    info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "gather.toml",
        "gather.json",
        "config.toml",
        "config.json",
        "../gather.toml",
        "../config.toml",
    ];
    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| GatherError::Config(format!("missing environment variable: {name}")))
}

fn string_var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| GatherError::Config(format!("invalid value for {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
