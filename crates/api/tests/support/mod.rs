//! Shared helpers for `clubhouse-app` integration tests.
//!
//! Each test gets its own wiremock server and a temporary snapshot
//! database, so contexts never share state.

#![allow(dead_code)]

use std::time::Duration;

use clubhouse_domain::Config;
use clubhouse_lib::{AppContext, AppContextOptions};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing at `server`, with millisecond backoff and a snapshot
/// database inside `dir`
pub fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.timeout_ms = 2_000;
    config.api.token = Some("test-token".to_string());
    config.retry.max_attempts = 2;
    config.retry.initial_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.cache.database_path =
        Some(dir.path().join("snapshots.db").to_string_lossy().into_owned());
    config.connectivity.probe_interval_ms = 50;
    config
}

/// Context without the background probe; tests flip connectivity by hand
pub async fn manual_context(
    server: &MockServer,
    dir: &TempDir,
    online: bool,
) -> AppContext {
    let options = AppContextOptions { start_probe: false, initially_online: online };
    AppContext::new_with_options(config_for(server, dir), options).await.expect("app context")
}

pub async fn mount_health(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn application_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "applicantName": name,
        "email": format!("{}@example.org", id),
        "opportunity": "Saturday food bank",
        "submittedAt": "2026-09-01T09:30:00Z",
        "status": "pending"
    })
}

/// Wait for the next finished drain of the offline queue
pub async fn wait_for_drain(events: &mut broadcast::Receiver<clubhouse_common::QueueEvent>) {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Ok(clubhouse_common::QueueEvent::DrainFinished { .. })) => return,
            Ok(Ok(_)) => {}
            other => panic!("no drain finished event: {other:?}"),
        }
    }
}
