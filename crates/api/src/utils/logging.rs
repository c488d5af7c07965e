use std::time::Duration;

use clubhouse_domain::{ClubhouseError, LoggingConfig, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.level`. Output is JSON when `config.json`
/// is set, human-readable otherwise.
///
/// # Errors
///
/// Returns `ClubhouseError::Config` for an unparsable level directive and
/// `ClubhouseError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            ClubhouseError::Config(format!("invalid logging.level {:?}: {err}", config.level))
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|err| ClubhouseError::Internal(format!("tracing already initialised: {err}")))
}

/// Log the outcome of a command execution with structured fields.
///
/// `disposition` is the facade label (`"completed"`, `"queued"`,
/// `"failed"`) or a read source such as `"cached"`. Queued counts as
/// success; the action is still owed but the command did its job.
#[inline]
pub fn log_command_execution(command: &str, disposition: &str, elapsed: Duration, success: bool) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(command, disposition, duration_ms, "command_execution_success");
    } else {
        warn!(command, disposition, duration_ms, "command_execution_failure");
    }
}

/// Stable label for a `ClubhouseError`, suitable for log fields
#[inline]
pub fn error_label(error: &ClubhouseError) -> &'static str {
    match error {
        ClubhouseError::Config(_) => "config",
        ClubhouseError::Network(_) => "network",
        ClubhouseError::Remote(_) => "remote",
        ClubhouseError::Auth(_) => "auth",
        ClubhouseError::Storage(_) => "storage",
        ClubhouseError::NotFound(_) => "not_found",
        ClubhouseError::Validation(_) => "validation",
        ClubhouseError::Internal(_) => "internal",
    }
}
