//! Integration tests for error infrastructure and the error classifier

#![cfg(feature = "foundation")]

use clubhouse_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use clubhouse_common::resilience::{
    classify, ErrorCategory, ErrorClassifier, FailureKind, RawFailure, Severity,
};

/// Validates the "401 means authentication" property over varied phrasings.
///
/// Assertions:
/// - Confirms every message containing `401` classifies as
///   `authentication`/`high` unless a network keyword precedes it.
#[test]
fn test_any_401_message_is_authentication() {
    let messages = [
        "401",
        "HTTP 401 Unauthorized",
        "Request failed with status code 401",
        "error 401: token expired",
        "{\"status\":401}",
    ];

    for message in messages {
        let record = classify(message);
        assert_eq!(record.category(), ErrorCategory::Authentication, "{message}");
        assert_eq!(record.severity(), Severity::High);
    }
}

#[test]
fn test_any_fetch_or_network_message_is_network() {
    for message in ["Failed to fetch", "TypeError: fetch failed", "Network Error", "network 500"] {
        assert_eq!(classify(message).category(), ErrorCategory::Network, "{message}");
    }
}

/// Tests classifier totality across every raw failure shape
/// Verifies:
/// - No input panics
/// - Every record carries at least one suggestion
#[test]
fn test_classifier_is_total_over_shapes() {
    let classifier = ErrorClassifier::new();
    let shapes = vec![
        RawFailure::null(),
        RawFailure::text(""),
        RawFailure::text("   "),
        RawFailure::error("serde", "expected value at line 1"),
        RawFailure::from(serde_json::json!([1, 2, 3])),
        RawFailure::from(serde_json::json!(null)),
        RawFailure::from(serde_json::json!(true)),
        RawFailure::from(Some("HTTP 500")),
        RawFailure::from(CommonError::config_field("retry.max_attempts", "must be at least 1")),
    ];

    for raw in shapes {
        for offline in [false, true] {
            let record = classifier.classify(&raw, offline);
            assert!(!record.suggestions().is_empty(), "{raw:?}");
            assert!(!record.message().is_empty(), "{raw:?}");
        }
    }
}

#[test]
fn test_common_error_shapes_classify_sensibly() {
    let config = RawFailure::from(CommonError::config_field("capacity", "must be at least 1"));
    assert_eq!(config.kind(), FailureKind::Error);
    assert_eq!(classify(config).category(), ErrorCategory::Unknown);

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let decode = classify(CommonError::from(json_err));
    assert_eq!(decode.category(), ErrorCategory::Unknown);
    assert!(!decode.is_retryable());
}

#[test]
fn test_record_feeds_error_classification() {
    let record = classify("HTTP 502 server error");
    assert!(record.is_retryable());
    assert_eq!(ErrorClassification::severity(&record), ErrorSeverity::Warning);
    assert!(!record.is_critical());
}
