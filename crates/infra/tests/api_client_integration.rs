//! Integration tests for the club API client
//!
//! Runs the HTTP adapter against a `wiremock` server, alone and underneath
//! the resilience facade.

use std::sync::Arc;
use std::time::Duration;

use clubhouse_common::resilience::{BackoffStrategy, ErrorCategory, RetryPolicy};
use clubhouse_core::{
    AccessTokenProvider, ApplicationGateway, ApplicationService, ReportGateway, ResilienceContext,
};
use clubhouse_domain::{
    ApplicationId, ApplicationStatus, ClubhouseError, ReportFormat, ReportKind, ReportRequest,
};
use clubhouse_infra::{ClubApiClient, ClubApiConfig, StaticTokenProvider};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer, token: Option<&str>) -> ClubApiClient {
    let config = ClubApiConfig {
        base_url: format!("{}/api", server.uri()),
        timeout: Duration::from_secs(2),
        health_path: "/health".to_string(),
    };
    let auth: Arc<dyn AccessTokenProvider> =
        Arc::new(StaticTokenProvider::new(token.map(str::to_string)));
    ClubApiClient::new(config, auth).expect("api client")
}

#[tokio::test]
async fn test_list_pending_sends_token_and_parses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/applications"))
        .and(query_param("status", "pending"))
        .and(header("authorization", "Bearer club-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "a-1",
            "applicantName": "Robin Diaz",
            "email": "robin@example.org",
            "opportunity": "Saturday food bank",
            "submittedAt": "2026-09-01T09:30:00Z",
            "status": "pending"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let applications = api(&server, Some("club-token")).list_pending().await.unwrap();

    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].id, ApplicationId::new("a-1"));
    assert_eq!(applications[0].status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn test_reject_posts_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/applications/a-9/reject"))
        .and(body_json(json!({ "reason": "Opportunity is full" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    api(&server, None)
        .reject(&ApplicationId::new("a-9"), Some("Opportunity is full"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bulk_approve_returns_server_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/applications/bulk-approve"))
        .and(body_json(json!({ "ids": ["a-1", "a-2", "a-3"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "succeeded": ["a-1", "a-3"],
            "failed": [{ "id": "a-2", "error": "Applicant withdrew" }]
        })))
        .mount(&server)
        .await;

    let ids: Vec<_> = ["a-1", "a-2", "a-3"].into_iter().map(ApplicationId::new).collect();
    let response = api(&server, None).bulk_approve(&ids).await.unwrap();

    assert_eq!(response.succeeded, vec![ApplicationId::new("a-1"), ApplicationId::new("a-3")]);
    assert_eq!(response.failed[0].error, "Applicant withdrew");
}

/// Validates `ClubApiClient` behavior for non-success statuses.
///
/// Assertions:
/// - Confirms the error is `Remote` and starts with the status line.
/// - Confirms classification follows the status code.
#[tokio::test]
async fn test_status_errors_are_remote_and_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/applications/a-1/approve"))
        .respond_with(ResponseTemplate::new(403).set_body_string("not an admin"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/applications/a-2/approve"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = api(&server, None);
    let forbidden = client.approve(&ApplicationId::new("a-1")).await.unwrap_err();
    let unavailable = client.approve(&ApplicationId::new("a-2")).await.unwrap_err();

    assert_eq!(forbidden, ClubhouseError::Remote("HTTP 403 Forbidden: not an admin".into()));
    let classifier = clubhouse_common::resilience::ErrorClassifier::new();
    let classify = |err: ClubhouseError| classifier.classify(&err.into(), false).category();
    assert_eq!(classify(forbidden), ErrorCategory::Permission);
    assert_eq!(classify(unavailable), ErrorCategory::Server);
}

#[tokio::test]
async fn test_export_keeps_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reports/export"))
        .and(body_json(json!({ "kind": "volunteer_hours", "format": "csv" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/csv; charset=utf-8")
                .set_body_bytes(b"member,hours\nRobin,12\n".to_vec()),
        )
        .mount(&server)
        .await;

    let request = ReportRequest::new(ReportKind::VolunteerHours, ReportFormat::Csv);
    let report = api(&server, None).export(&request).await.unwrap();

    assert_eq!(report.file_name, "volunteer_hours.csv");
    assert_eq!(report.content_type, "text/csv; charset=utf-8");
    assert_eq!(report.body, b"member,hours\nRobin,12\n");
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(api(&server, None).check_health().await.unwrap());
}

/// Tests the HTTP adapter underneath the application service.
/// Verifies:
/// - Two 503 answers are retried by the facade
/// - The third request succeeds and the outcome is completed
#[tokio::test]
async fn test_facade_retries_server_errors_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/applications/a-5/approve"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/applications/a-5/approve"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_attempts: 3,
        backoff: BackoffStrategy::Fixed(Duration::from_millis(5)),
    };
    let context = ResilienceContext::builder().with_default_policy(policy).build().unwrap();
    let service = ApplicationService::new(Arc::new(api(&server, None)), context.operations());

    let outcome = service.approve(ApplicationId::new("a-5")).await;

    assert!(outcome.is_completed(), "{outcome:?}");
}
