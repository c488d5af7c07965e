//! Health-endpoint connectivity probe
//!
//! Polls the API health endpoint on a fixed interval and reports
//! `Online`/`Offline` signals to the [`ConnectivityMonitor`]. The monitor
//! suppresses repeated signals, so only real changes reach subscribers and
//! the offline queue.
//!
//! # Lifecycle
//!
//! - [`ConnectivityProbe::start`] spawns the worker and keeps its handle
//! - [`ConnectivityProbe::stop`] cancels it and waits for the task to finish
//! - the first probe runs immediately on start

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clubhouse_common::resilience::{ConnectivityMonitor, PlatformSignal};
use clubhouse_domain::{ClubhouseError, Result};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::ClubApiClient;

/// Upper bound for one check, independent of the HTTP timeout
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can tell whether the remote side is reachable
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// `Ok(true)` when the remote answers with success
    async fn check_health(&self) -> Result<bool>;
}

#[async_trait]
impl HealthCheck for ClubApiClient {
    async fn check_health(&self) -> Result<bool> {
        ClubApiClient::check_health(self).await
    }
}

/// Background poller feeding the connectivity monitor
pub struct ConnectivityProbe {
    health: Arc<dyn HealthCheck>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
    task_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl ConnectivityProbe {
    pub fn new(
        health: Arc<dyn HealthCheck>,
        monitor: Arc<ConnectivityMonitor>,
        interval: Duration,
    ) -> Self {
        Self {
            health,
            monitor,
            interval,
            task_handle: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Run one check and report the result
    ///
    /// Returns whether the remote was reachable.
    pub async fn probe_once(&self) -> bool {
        probe(self.health.as_ref(), &self.monitor).await
    }

    /// Start background polling
    ///
    /// # Errors
    ///
    /// Returns `ClubhouseError::Internal` if the probe is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.task_handle.is_some() {
            return Err(ClubhouseError::Internal("connectivity probe already running".into()));
        }
        if self.cancellation.is_cancelled() {
            self.cancellation = CancellationToken::new();
        }

        info!(interval_ms = self.interval.as_millis() as u64, "starting connectivity probe");
        let worker = probe_worker(
            Arc::clone(&self.health),
            Arc::clone(&self.monitor),
            self.interval,
            self.cancellation.clone(),
        );
        self.task_handle = Some(tokio::spawn(worker));
        Ok(())
    }

    /// Stop polling and wait for the worker to exit
    ///
    /// # Errors
    ///
    /// Returns `ClubhouseError::Internal` if the worker does not stop within
    /// five seconds or panicked.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            tokio::time::timeout(STOP_TIMEOUT, handle)
                .await
                .map_err(|_| {
                    ClubhouseError::Internal("connectivity probe shutdown timeout".into())
                })?
                .map_err(|e| ClubhouseError::Internal(format!("probe task join failed: {e}")))?;
        }

        info!("connectivity probe stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some() && !self.cancellation.is_cancelled()
    }

    /// Token that stops the worker when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

impl Drop for ConnectivityProbe {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

async fn probe(health: &dyn HealthCheck, monitor: &ConnectivityMonitor) -> bool {
    let reachable = match tokio::time::timeout(CHECK_TIMEOUT, health.check_health()).await {
        Ok(Ok(healthy)) => healthy,
        Ok(Err(err)) => {
            debug!(error = %err, "health check failed");
            false
        }
        Err(_) => {
            warn!("health check timeout");
            false
        }
    };

    let signal = if reachable { PlatformSignal::Online } else { PlatformSignal::Offline };
    if let Some(transition) = monitor.report(signal) {
        info!(?transition, "connectivity changed by health probe");
    }
    reachable
}

async fn probe_worker(
    health: Arc<dyn HealthCheck>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("connectivity probe worker shutting down");
                break;
            }
            _ = ticker.tick() => {
                probe(health.as_ref(), &monitor).await;
            }
        }
    }
}
