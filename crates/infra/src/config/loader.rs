//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `CLUBHOUSE_API_BASE_URL` is set, configuration comes from the
//!    environment on top of the built-in defaults
//! 2. Otherwise the first config file found by [`probe_config_paths`] is
//!    read, and any `CLUBHOUSE_*` variables that are set override it
//! 3. With neither, the defaults (plus overrides) are used
//!
//! Every path ends in [`validate`].
//!
//! ## Environment Variables
//! - `CLUBHOUSE_API_BASE_URL`: Remote API base URL
//! - `CLUBHOUSE_API_TIMEOUT_MS`: Request timeout
//! - `CLUBHOUSE_API_HEALTH_PATH`: Health endpoint, relative to the base URL
//! - `CLUBHOUSE_API_TOKEN`: Bearer token
//! - `CLUBHOUSE_RETRY_MAX_ATTEMPTS`: Attempts per mutating call
//! - `CLUBHOUSE_RETRY_INITIAL_DELAY_MS` / `CLUBHOUSE_RETRY_MAX_DELAY_MS`
//! - `CLUBHOUSE_CACHE_TTL_MS`: Snapshot freshness window
//! - `CLUBHOUSE_CACHE_DB_PATH`: SQLite file for snapshots
//! - `CLUBHOUSE_QUEUE_CAPACITY`: Maximum queued operations
//! - `CLUBHOUSE_QUEUE_MAX_REPLAY_ATTEMPTS`
//! - `CLUBHOUSE_PROBE_INTERVAL_MS`: Health probe interval
//! - `CLUBHOUSE_LOG_LEVEL`: Filter directive when `RUST_LOG` is unset
//! - `CLUBHOUSE_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! `clubhouse.toml`, `clubhouse.json`, `config.toml` and `config.json` are
//! probed in the working directory, its parent and grandparent, then next to
//! the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clubhouse_domain::{ClubhouseError, Config, Result};
use url::Url;

const BASE_URL_VAR: &str = "CLUBHOUSE_API_BASE_URL";
const CONFIG_FILE_NAMES: [&str; 4] =
    ["clubhouse.toml", "clubhouse.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ClubhouseError::Config` if a file or variable is malformed or
/// the resulting configuration does not validate.
pub fn load() -> Result<Config> {
    if std::env::var_os(BASE_URL_VAR).is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::warn!("No config file found, using defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `CLUBHOUSE_API_BASE_URL` is required; every other variable falls back to
/// its default.
///
/// # Errors
/// Returns `ClubhouseError::Config` if the base URL is missing or a value
/// does not parse.
pub fn load_from_env() -> Result<Config> {
    env_var(BASE_URL_VAR)?;
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Overwrite fields of `config` with every `CLUBHOUSE_*` variable that is set
///
/// # Errors
/// Returns `ClubhouseError::Config` when a numeric or boolean value does not
/// parse.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(value) = env_opt(BASE_URL_VAR) {
        config.api.base_url = value;
    }
    if let Some(value) = env_parsed("CLUBHOUSE_API_TIMEOUT_MS")? {
        config.api.timeout_ms = value;
    }
    if let Some(value) = env_opt("CLUBHOUSE_API_HEALTH_PATH") {
        config.api.health_path = value;
    }
    if let Some(value) = env_opt("CLUBHOUSE_API_TOKEN") {
        config.api.token = Some(value);
    }

    if let Some(value) = env_parsed("CLUBHOUSE_RETRY_MAX_ATTEMPTS")? {
        config.retry.max_attempts = value;
    }
    if let Some(value) = env_parsed("CLUBHOUSE_RETRY_INITIAL_DELAY_MS")? {
        config.retry.initial_delay_ms = value;
    }
    if let Some(value) = env_parsed("CLUBHOUSE_RETRY_MAX_DELAY_MS")? {
        config.retry.max_delay_ms = value;
    }

    if let Some(value) = env_parsed("CLUBHOUSE_CACHE_TTL_MS")? {
        config.cache.default_ttl_ms = value;
    }
    if let Some(value) = env_opt("CLUBHOUSE_CACHE_DB_PATH") {
        config.cache.database_path = Some(value);
    }

    if let Some(value) = env_parsed("CLUBHOUSE_QUEUE_CAPACITY")? {
        config.queue.capacity = Some(value);
    }
    if let Some(value) = env_parsed("CLUBHOUSE_QUEUE_MAX_REPLAY_ATTEMPTS")? {
        config.queue.max_replay_attempts = value;
    }

    if let Some(value) = env_parsed("CLUBHOUSE_PROBE_INTERVAL_MS")? {
        config.connectivity.probe_interval_ms = value;
    }

    if let Some(value) = env_opt("CLUBHOUSE_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Some(value) = env_bool("CLUBHOUSE_LOG_JSON")? {
        config.logging.json = value;
    }
    Ok(())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. JSON and TOML are
/// supported, detected by file extension. Sections and fields left out of
/// the file keep their defaults.
///
/// # Errors
/// Returns `ClubhouseError::Config` if the file is missing, unreadable, or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ClubhouseError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ClubhouseError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ClubhouseError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration by file extension (`.json` or `.toml`)
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ClubhouseError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ClubhouseError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ClubhouseError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Range checks plus a well-formed `http`/`https` base URL
///
/// # Errors
/// Returns `ClubhouseError::Config` describing the first invalid value.
pub fn validate(config: &Config) -> Result<()> {
    config.validate()?;

    let url = Url::parse(&config.api.base_url).map_err(|e| {
        ClubhouseError::Config(format!("api.base_url {:?} is not a URL: {e}", config.api.base_url))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClubhouseError::Config(format!(
            "api.base_url must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(())
}

/// First existing config file in the standard locations
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
        roots.push(cwd.join("../.."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        ClubhouseError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-blank
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ClubhouseError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str) -> Result<Option<bool>> {
    let Some(raw) = env_opt(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => Err(ClubhouseError::Config(format!("Invalid boolean for {key}: {other}"))),
    }
}
