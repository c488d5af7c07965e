//! Application context - dependency injection container
//!
//! The only place in production that constructs the resilience context,
//! the API client and the services riding on them.

use std::sync::Arc;
use std::time::Duration;

use clubhouse_common::resilience::SnapshotStore;
use clubhouse_core::{
    AccessTokenProvider, ApplicationGateway, ApplicationService, ReportGateway, ReportService,
    ResilienceContext,
};
use clubhouse_domain::{ClubhouseError, Config, Result};
use clubhouse_infra::config::loader;
use clubhouse_infra::{
    ClubApiClient, ClubApiConfig, ConnectivityProbe, HealthCheck, SqliteSnapshotStore,
    StaticTokenProvider,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Construction options, mostly for tests
#[derive(Debug, Clone, Copy)]
pub struct AppContextOptions {
    /// Poll the health endpoint in the background
    pub start_probe: bool,
    /// Connectivity assumed until the first probe answers
    pub initially_online: bool,
}

impl Default for AppContextOptions {
    fn default() -> Self {
        Self { start_probe: true, initially_online: true }
    }
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub resilience: ResilienceContext,
    pub applications: Arc<ApplicationService>,
    pub reports: Arc<ReportService>,
    pub api: Arc<ClubApiClient>,
    pub snapshot_store: Arc<SqliteSnapshotStore>,

    probe: Mutex<ConnectivityProbe>,
    shutdown_token: CancellationToken,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("base_url", &self.api.config().base_url)
            .field("resilience", &self.resilience)
            .field("snapshot_store", &self.snapshot_store)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Create the context from the environment and config files
    pub async fn new() -> Result<Self> {
        let config = loader::load()?;
        Self::new_with_config(config).await
    }

    /// Create the context from an explicit configuration
    pub async fn new_with_config(config: Config) -> Result<Self> {
        Self::new_with_options(config, AppContextOptions::default()).await
    }

    /// Create the context with explicit options
    ///
    /// Tests use this to drive connectivity by hand instead of through the
    /// health probe.
    pub async fn new_with_options(config: Config, options: AppContextOptions) -> Result<Self> {
        loader::validate(&config)?;

        let snapshot_store = Arc::new(open_snapshot_store(&config)?);

        let resilience = ResilienceContext::builder()
            .with_config(&config)
            .with_store(Arc::clone(&snapshot_store) as Arc<dyn SnapshotStore>)
            .initially_online(options.initially_online)
            .start()?;

        let token_provider: Arc<dyn AccessTokenProvider> =
            Arc::new(StaticTokenProvider::new(config.api.token.clone()));
        let api = Arc::new(ClubApiClient::new(ClubApiConfig::from(&config.api), token_provider)?);

        let operations = resilience.operations();
        let applications = Arc::new(ApplicationService::new(
            Arc::clone(&api) as Arc<dyn ApplicationGateway>,
            operations.clone(),
        ));
        let reports = Arc::new(ReportService::new(
            Arc::clone(&api) as Arc<dyn ReportGateway>,
            operations,
        ));

        let mut probe = ConnectivityProbe::new(
            Arc::clone(&api) as Arc<dyn HealthCheck>,
            Arc::clone(resilience.monitor()),
            Duration::from_millis(config.connectivity.probe_interval_ms),
        );
        if options.start_probe {
            probe.start()?;
        }

        info!(
            base_url = %api.config().base_url,
            persistent_cache = snapshot_store.path().is_some(),
            probe = options.start_probe,
            "application context ready"
        );

        Ok(Self {
            config,
            resilience,
            applications,
            reports,
            api,
            snapshot_store,
            probe: Mutex::new(probe),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Token cancelled once [`shutdown`](Self::shutdown) runs
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Probe the API once and update connectivity right away
    pub async fn refresh_connectivity(&self) -> bool {
        self.probe.lock().await.probe_once().await
    }

    /// Stop background work
    ///
    /// Queued operations stay queued in memory; they are lost when the
    /// process exits. Calling this twice is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Ok(());
        }
        self.shutdown_token.cancel();

        let pending = self.resilience.queue().count();
        if pending > 0 {
            warn!(pending, "shutting down with queued operations");
        }

        let stopped = {
            let mut probe = self.probe.lock().await;
            if probe.is_running() {
                probe.stop().await
            } else {
                Ok(())
            }
        };
        self.resilience.shutdown();

        info!("application context shut down");
        stopped
    }

    /// Component health for the status view
    pub async fn health_check(&self) -> HealthStatus {
        let api = match self.api.check_health().await {
            Ok(true) => ComponentHealth::healthy("api"),
            Ok(false) => ComponentHealth::unhealthy("api", "health endpoint answered non-success"),
            Err(err) => ComponentHealth::unhealthy("api", err.to_string()),
        };

        let store = match self.snapshot_store.len() {
            Ok(entries) => {
                ComponentHealth::healthy_with("snapshot_store", format!("{entries} entries"))
            }
            Err(err) => ComponentHealth::unhealthy("snapshot_store", err.to_string()),
        };

        let listener = if self.resilience.is_started() {
            ComponentHealth::healthy("replay_listener")
        } else {
            ComponentHealth::unhealthy("replay_listener", "offline queue is not attached")
        };

        let pending = self.resilience.queue().count();
        let queue = ComponentHealth::healthy_with("offline_queue", format!("{pending} pending"));

        let mut status = HealthStatus::new()
            .add_component(api)
            .add_component(store)
            .add_component(listener)
            .add_component(queue);
        status.calculate_score();
        status
    }
}

fn open_snapshot_store(config: &Config) -> Result<SqliteSnapshotStore> {
    match config.cache.database_path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => SqliteSnapshotStore::open(path),
        _ => {
            warn!("cache.database_path not set; snapshots will not survive a restart");
            SqliteSnapshotStore::in_memory()
        }
    }
    .map_err(|err| match err {
        ClubhouseError::Storage(msg) => ClubhouseError::Storage(format!("snapshot store: {msg}")),
        other => other,
    })
}
