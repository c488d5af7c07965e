//! Command execution helpers
//!
//! Every command handler goes through [`execute_command`] so timing and the
//! `command_execution_*` log line look the same everywhere.

use std::future::Future;
use std::time::Instant;

use clubhouse_core::{FetchOutcome, OperationOutcome};

use crate::utils::logging::log_command_execution;

/// How a command result is summarised in logs
pub trait CommandDisposition {
    fn disposition(&self) -> &'static str;

    fn is_success(&self) -> bool;
}

impl<T> CommandDisposition for OperationOutcome<T> {
    fn disposition(&self) -> &'static str {
        self.label()
    }

    fn is_success(&self) -> bool {
        !self.is_failed()
    }
}

impl<T> CommandDisposition for FetchOutcome<T> {
    fn disposition(&self) -> &'static str {
        match self {
            FetchOutcome::Fresh(_) => "fresh",
            FetchOutcome::Cached(snapshot) if snapshot.is_stale => "stale",
            FetchOutcome::Cached(_) => "cached",
            FetchOutcome::Unavailable(_) => "unavailable",
        }
    }

    fn is_success(&self) -> bool {
        !matches!(self, FetchOutcome::Unavailable(_))
    }
}

impl<T, E> CommandDisposition for Result<T, E> {
    fn disposition(&self) -> &'static str {
        if self.is_ok() {
            "ok"
        } else {
            "error"
        }
    }

    fn is_success(&self) -> bool {
        self.is_ok()
    }
}

/// Run a command body, then log its duration and disposition
///
/// # Example
///
/// ```rust,ignore
/// pub async fn approve_application(ctx: &AppContext, id: String) -> OperationOutcome<()> {
///     execute_command("applications::approve", async {
///         ctx.applications.approve(ApplicationId::new(id)).await
///     })
///     .await
/// }
/// ```
pub async fn execute_command<Fut, T>(command_name: &str, body: Fut) -> T
where
    Fut: Future<Output = T>,
    T: CommandDisposition,
{
    let start = Instant::now();
    let result = body.await;
    log_command_execution(
        command_name,
        result.disposition(),
        start.elapsed(),
        result.is_success(),
    );
    result
}
