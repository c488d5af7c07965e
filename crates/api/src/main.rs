//! Clubhouse - headless admin dashboard backend
//!
//! `clubhouse [run|status|pending|health]`. `run` (the default) keeps the
//! connectivity probe and offline replay going until Ctrl-C; the other
//! subcommands print one JSON document and exit.

use anyhow::{bail, Context, Result};
use clubhouse_lib::utils::logging::init_tracing;
use clubhouse_lib::AppContext;
use serde::Serialize;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = clubhouse_infra::config::loader::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise logging")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "could not read .env file"),
    }

    let command = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());
    let context = AppContext::new_with_config(config).await.context("failed to start Clubhouse")?;

    let outcome = match command.as_str() {
        "run" => run(&context).await,
        "status" => {
            context.refresh_connectivity().await;
            print_json(&clubhouse_lib::get_connectivity_status(&context))
        }
        "pending" => print_json(&clubhouse_lib::list_pending_applications(&context).await),
        "health" => print_json(&clubhouse_lib::get_app_health(&context).await),
        other => Err(anyhow::anyhow!(
            "unknown command {other:?}; expected run, status, pending or health"
        )),
    };

    context.shutdown().await.context("shutdown failed")?;
    outcome
}

async fn run(context: &AppContext) -> Result<()> {
    info!("Clubhouse running; press Ctrl-C to stop");
    let mut transitions = context.resilience.monitor().subscribe();
    let token = context.shutdown_token();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("shutdown requested");
                return Ok(());
            }
            () = token.cancelled() => return Ok(()),
            transition = transitions.recv() => match transition {
                Ok(transition) => info!(
                    online = transition.current.is_online(),
                    queued = context.resilience.queue().count(),
                    "connectivity changed"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed connectivity transitions");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    bail!("connectivity monitor closed");
                }
            },
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
