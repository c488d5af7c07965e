//! Club API client
//!
//! Implements the application and report gateways over HTTP. Every call
//! goes out once; the facade in `clubhouse-core` decides about retries,
//! queuing and cached fallbacks based on the error this client returns.
//!
//! Non-success answers become [`ClubhouseError::Remote`] with a message of
//! the form `HTTP <code> <reason>: <body excerpt>`, transport failures
//! become [`ClubhouseError::Network`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clubhouse_core::{AccessTokenProvider, ApplicationGateway, ReportGateway};
use clubhouse_domain::constants::{DEFAULT_API_TIMEOUT_MS, DEFAULT_HEALTH_PATH};
use clubhouse_domain::{
    ApiConfig, Application, ApplicationId, BulkResponse, ClubhouseError, ExportedReport,
    ReportRequest, Result,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use crate::errors::{status_message, InfraError};

/// Upper bound for a single health check
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`ClubApiClient`]
#[derive(Debug, Clone)]
pub struct ClubApiConfig {
    /// Base URL for the API (e.g., "https://club.example.org/api")
    pub base_url: String,
    pub timeout: Duration,
    pub health_path: String,
}

impl Default for ClubApiConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for ClubApiConfig {
    fn from(config: &ApiConfig) -> Self {
        let timeout_ms =
            if config.timeout_ms == 0 { DEFAULT_API_TIMEOUT_MS } else { config.timeout_ms };
        let health_path = if config.health_path.trim().is_empty() {
            DEFAULT_HEALTH_PATH.to_string()
        } else {
            config.health_path.clone()
        };
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
            health_path,
        }
    }
}

/// HTTP implementation of [`ApplicationGateway`] and [`ReportGateway`]
pub struct ClubApiClient {
    http: HttpClient,
    auth: Arc<dyn AccessTokenProvider>,
    config: ClubApiConfig,
}

impl ClubApiClient {
    /// # Errors
    ///
    /// Returns `ClubhouseError::Network` if the underlying client cannot be
    /// built (TLS backend initialisation).
    pub fn new(config: ClubApiConfig, auth: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.timeout).build()?;
        Ok(Self { http, auth, config })
    }

    pub fn config(&self) -> &ClubApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}/{}", self.config.base_url, path)
        }
    }

    /// Send one authenticated request; non-success statuses become
    /// `Remote` errors
    async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = self.url(path);
        let mut request =
            self.http.request(method.clone(), &url).header(ACCEPT, "application/json");
        if let Some(token) = self.auth.access_token().await? {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%method, path, status = status.as_u16(), "remote call rejected");
            return Err(ClubhouseError::Remote(status_message(status, &body)));
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|err| InfraError::from(err).into())
    }

    /// Whether the health endpoint answers with a success status
    ///
    /// # Errors
    ///
    /// Returns `ClubhouseError::Network` when the endpoint cannot be reached
    /// or does not answer within five seconds.
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> Result<bool> {
        let url = self.url(&self.config.health_path);
        let request = self.http.request(Method::GET, &url);

        let response = tokio::time::timeout(HEALTH_TIMEOUT, self.http.send(request))
            .await
            .map_err(|_| ClubhouseError::Network("health check timed out".into()))??;

        let healthy = response.status().is_success();
        if !healthy {
            debug!(status = %response.status(), "health endpoint returned non-success status");
        }
        Ok(healthy)
    }
}

#[async_trait]
impl ApplicationGateway for ClubApiClient {
    #[instrument(skip(self))]
    async fn list_pending(&self) -> Result<Vec<Application>> {
        let response = self.call::<()>(Method::GET, "/applications?status=pending", None).await?;
        let applications: Vec<Application> = Self::json(response).await?;
        debug!(count = applications.len(), "pending applications fetched");
        Ok(applications)
    }

    #[instrument(skip(self), fields(application_id = %id))]
    async fn approve(&self, id: &ApplicationId) -> Result<()> {
        self.call::<()>(Method::POST, &format!("/applications/{id}/approve"), None).await?;
        info!(application_id = %id, "application approved remotely");
        Ok(())
    }

    #[instrument(skip(self, reason), fields(application_id = %id))]
    async fn reject(&self, id: &ApplicationId, reason: Option<&str>) -> Result<()> {
        let body = json!({ "reason": reason });
        self.call(Method::POST, &format!("/applications/{id}/reject"), Some(&body)).await?;
        info!(application_id = %id, "application rejected remotely");
        Ok(())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn bulk_approve(&self, ids: &[ApplicationId]) -> Result<BulkResponse> {
        let body = json!({ "ids": ids });
        let response = self.call(Method::POST, "/applications/bulk-approve", Some(&body)).await?;
        Self::json(response).await
    }
}

#[async_trait]
impl ReportGateway for ClubApiClient {
    #[instrument(skip(self, request), fields(kind = %request.kind, format = %request.format))]
    async fn export(&self, request: &ReportRequest) -> Result<ExportedReport> {
        let response = self.call(Method::POST, "/reports/export", Some(request)).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| request.format.content_type().to_string(), str::to_string);
        let body =
            response.bytes().await.map_err(|err| ClubhouseError::from(InfraError::from(err)))?;

        info!(bytes = body.len(), "report exported");
        Ok(ExportedReport { file_name: request.file_name(), content_type, body: body.to_vec() })
    }
}
