//! Error classification
//!
//! Turns any raw failure into an [`ErrorRecord`]: a category, a severity and
//! ordered recovery suggestions. Classification is pure and total. Every
//! input, including "null" and plain strings, produces a valid record.
//!
//! Rules are checked in order and the first match wins:
//!
//! | # | Trigger (case-insensitive) | Category | Severity |
//! |---|----------------------------|----------|----------|
//! | 1 | network-type failure, `fetch`, `network` | `network` | medium |
//! | 2 | `401`, `unauthorized` | `authentication` | high |
//! | 3 | `403`, `forbidden` | `permission` | high |
//! | 4 | `404` | `unknown` (not found) | low |
//! | 5 | `400` | `validation` | low |
//! | 6 | `500`, `server` | `server` | medium |
//! | 7 | anything else | `unknown` | low |
//!
//! When the caller reports that the client is offline, suggestions are
//! replaced with connectivity-first guidance regardless of category.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, ErrorClassification, ErrorSeverity};

/// Category of a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Network,
    Authentication,
    Permission,
    Validation,
    Server,
    Unknown,
}

impl ErrorCategory {
    /// Whether re-attempting the same operation may help
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Short badge text for the presentation layer
    pub const fn label(self) -> &'static str {
        match self {
            Self::Network => "Network",
            Self::Authentication => "Authentication",
            Self::Permission => "Permission",
            Self::Validation => "Validation",
            Self::Server => "Server",
            Self::Unknown => "Unknown",
        }
    }

    /// Lowercase identifier, matching the serialized form
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::Permission => "permission",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing severity of a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorized, severity-ranked failure with recovery suggestions
///
/// Records are immutable once created; [`ErrorRecord::with_support_id`]
/// returns a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    category: ErrorCategory,
    severity: Severity,
    message: String,
    suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    support_id: Option<String>,
}

impl ErrorRecord {
    /// Build a record directly, bypassing classification
    pub fn new(
        category: ErrorCategory,
        severity: Severity,
        message: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self { category, severity, message: message.into(), suggestions, support_id: None }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn support_id(&self) -> Option<&str> {
        self.support_id.as_deref()
    }

    /// Copy of this record tagged with a support correlation id
    #[must_use]
    pub fn with_support_id(&self, support_id: impl Into<String>) -> Self {
        Self { support_id: Some(support_id.into()), ..self.clone() }
    }

    /// Whether the failure's category is worth retrying
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.category, self.severity, self.message)
    }
}

impl std::error::Error for ErrorRecord {}

impl ErrorClassification for ErrorRecord {
    fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    fn severity(&self) -> ErrorSeverity {
        match self.severity {
            Severity::Low => ErrorSeverity::Info,
            Severity::Medium => ErrorSeverity::Warning,
            Severity::High => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Shape of a raw failure before classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport-level failure (connection refused, DNS, timeout)
    Network,
    /// A typed error value
    Error,
    /// A bare string
    Text,
    /// An arbitrary structured value
    Value,
    /// Nothing at all
    Null,
}

/// Any failure value, normalized so classification can stay total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFailure {
    kind: FailureKind,
    message: String,
    source_name: Option<String>,
    /// Free text shown to the user but never matched by the classifier
    detail: Option<String>,
}

impl RawFailure {
    /// Transport-level failure
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            message: message.into(),
            source_name: None,
            detail: None,
        }
    }

    /// Typed error with the name of the type or subsystem that raised it
    pub fn error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: message.into(),
            source_name: Some(source_name.into()),
            detail: None,
        }
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self { kind: FailureKind::Text, message: message.into(), source_name: None, detail: None }
    }

    pub fn null() -> Self {
        Self { kind: FailureKind::Null, message: String::new(), source_name: None, detail: None }
    }

    /// Attach text such as a response body; blank text is ignored
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.detail = (!detail.trim().is_empty()).then_some(detail);
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source_name, self.kind) {
            (_, FailureKind::Null) => f.write_str("null")?,
            (Some(source), _) => write!(f, "{source}: {}", self.message)?,
            (None, _) => f.write_str(&self.message)?,
        }
        match &self.detail {
            Some(detail) => write!(f, ": {detail}"),
            None => Ok(()),
        }
    }
}

impl From<&str> for RawFailure {
    fn from(message: &str) -> Self {
        Self::text(message)
    }
}

impl From<String> for RawFailure {
    fn from(message: String) -> Self {
        Self::text(message)
    }
}

impl From<std::io::Error> for RawFailure {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::TimedOut
            | ErrorKind::BrokenPipe => Self {
                kind: FailureKind::Network,
                message: err.to_string(),
                source_name: Some("io".to_string()),
                detail: None,
            },
            _ => Self::error("io", err.to_string()),
        }
    }
}

impl From<serde_json::Value> for RawFailure {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::null(),
            serde_json::Value::String(message) => Self::text(message),
            serde_json::Value::Object(ref map) => {
                let message = map
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| value.to_string(), str::to_string);
                Self { kind: FailureKind::Value, message, source_name: None, detail: None }
            }
            other => Self {
                kind: FailureKind::Value,
                message: other.to_string(),
                source_name: None,
                detail: None,
            },
        }
    }
}

impl From<CommonError> for RawFailure {
    fn from(err: CommonError) -> Self {
        Self::error("common", err.to_string())
    }
}

impl<E: Into<RawFailure>> From<Option<E>> for RawFailure {
    fn from(value: Option<E>) -> Self {
        value.map_or_else(Self::null, Into::into)
    }
}

#[cfg(feature = "runtime")]
impl From<reqwest::Error> for RawFailure {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() || err.is_timeout() || err.is_request() {
            FailureKind::Network
        } else {
            FailureKind::Error
        };
        Self {
            kind,
            message: err.to_string(),
            source_name: Some("reqwest".to_string()),
            detail: None,
        }
    }
}

const CHECK_CONNECTION: &str = "Check your internet connection.";
const RETRY_SHORTLY: &str = "Try again in a few moments.";
const SIGN_IN_AGAIN: &str = "Sign in again to refresh your session.";
const CONTACT_ADMIN: &str = "Contact an administrator if you need access.";
const MAY_HAVE_MOVED: &str = "The resource may have been moved or deleted.";
const CHECK_INPUT: &str = "Check the submitted values and try again.";
const SERVER_TRANSIENT: &str = "The server had a temporary problem; try again later.";
const REFRESH_PAGE: &str = "Refresh the page.";
const CONTACT_SUPPORT: &str = "Contact support if the problem persists.";
const OFFLINE_HINT: &str = "You appear to be offline. Reconnect to the internet.";
const OFFLINE_SYNC: &str = "Changes made while offline are replayed once you are back online.";

/// Rule-based failure classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub const fn new() -> Self {
        Self
    }

    /// Classify a raw failure, taking the current connectivity into account
    pub fn classify(&self, raw: &RawFailure, offline: bool) -> ErrorRecord {
        let lowered = raw.message.to_lowercase();
        let has = |needle: &str| lowered.contains(needle);

        let (category, severity, suggestions): (_, _, &[&str]) = if raw.kind == FailureKind::Network
            || has("fetch")
            || has("network")
        {
            (ErrorCategory::Network, Severity::Medium, &[CHECK_CONNECTION, RETRY_SHORTLY])
        } else if has("401") || has("unauthorized") {
            (ErrorCategory::Authentication, Severity::High, &[SIGN_IN_AGAIN])
        } else if has("403") || has("forbidden") {
            (ErrorCategory::Permission, Severity::High, &[CONTACT_ADMIN])
        } else if has("404") {
            (ErrorCategory::Unknown, Severity::Low, &[MAY_HAVE_MOVED, REFRESH_PAGE])
        } else if has("400") {
            (ErrorCategory::Validation, Severity::Low, &[CHECK_INPUT])
        } else if has("500") || has("server") {
            (ErrorCategory::Server, Severity::Medium, &[SERVER_TRANSIENT])
        } else {
            (ErrorCategory::Unknown, Severity::Low, &[REFRESH_PAGE, CONTACT_SUPPORT])
        };

        let suggestions: &[&str] = if offline { &[OFFLINE_HINT, OFFLINE_SYNC] } else { suggestions };

        ErrorRecord::new(
            category,
            severity,
            Self::message_for(raw, category, has("404")),
            suggestions.iter().map(|s| (*s).to_string()).collect(),
        )
    }

    fn message_for(raw: &RawFailure, category: ErrorCategory, not_found: bool) -> String {
        if !raw.message.trim().is_empty() {
            return match &raw.detail {
                Some(detail) => format!("{}: {detail}", raw.message),
                None => raw.message.clone(),
            };
        }
        match category {
            ErrorCategory::Network => "Unable to reach the server.",
            ErrorCategory::Authentication => "Your session has expired.",
            ErrorCategory::Permission => "You do not have permission to do that.",
            ErrorCategory::Validation => "The request was rejected as invalid.",
            ErrorCategory::Server => "The server encountered an error.",
            ErrorCategory::Unknown if not_found => "The requested resource was not found.",
            ErrorCategory::Unknown => "An unexpected error occurred.",
        }
        .to_string()
    }
}

/// Classify a raw failure assuming the client is online
pub fn classify(raw: impl Into<RawFailure>) -> ErrorRecord {
    ErrorClassifier.classify(&raw.into(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `classify` behavior for the ordered rule table.
    ///
    /// Assertions:
    /// - Confirms each sample message maps to its expected category and
    ///   severity.
    #[test]
    fn test_rule_table() {
        let cases = [
            ("Failed to fetch", ErrorCategory::Network, Severity::Medium),
            ("NETWORK unreachable", ErrorCategory::Network, Severity::Medium),
            ("HTTP 401 Unauthorized", ErrorCategory::Authentication, Severity::High),
            ("request forbidden", ErrorCategory::Permission, Severity::High),
            ("HTTP 404 Not Found", ErrorCategory::Unknown, Severity::Low),
            ("HTTP 400 Bad Request", ErrorCategory::Validation, Severity::Low),
            ("HTTP 500 Internal Server Error", ErrorCategory::Server, Severity::Medium),
            ("something odd", ErrorCategory::Unknown, Severity::Low),
        ];

        for (message, category, severity) in cases {
            let record = classify(message);
            assert_eq!(record.category(), category, "message: {message}");
            assert_eq!(record.severity(), severity, "message: {message}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        // Both "network" and "401" appear; the network rule is checked first.
        let record = classify("network error after 401");
        assert_eq!(record.category(), ErrorCategory::Network);

        // "403" beats "server" because permission is checked before server.
        let record = classify("server said 403");
        assert_eq!(record.category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_network_kind_without_keywords() {
        let record = classify(RawFailure::network("connection refused"));
        assert_eq!(record.category(), ErrorCategory::Network);
        assert!(record.is_retryable());
    }

    /// Validates `classify` totality for non-error inputs.
    ///
    /// Assertions:
    /// - Ensures null, empty strings and structured values all produce an
    ///   `unknown`/`low` record with a non-empty message.
    #[test]
    fn test_classify_is_total() {
        let inputs = vec![
            RawFailure::null(),
            RawFailure::from(""),
            RawFailure::from(serde_json::json!(42)),
            RawFailure::from(serde_json::json!({"code": 7})),
            RawFailure::from(None::<String>),
        ];

        for raw in inputs {
            let record = classify(raw);
            assert_eq!(record.category(), ErrorCategory::Unknown);
            assert_eq!(record.severity(), Severity::Low);
            assert!(!record.message().is_empty());
            assert!(!record.suggestions().is_empty());
        }
    }

    #[test]
    fn test_json_object_message_is_used() {
        let raw = RawFailure::from(serde_json::json!({"message": "HTTP 403 Forbidden"}));
        assert_eq!(raw.kind(), FailureKind::Value);
        assert_eq!(classify(raw).category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_detail_is_shown_but_not_classified() {
        let raw = RawFailure::error("http", "HTTP 403 Forbidden")
            .with_detail("{\"error\":\"network admins only\"}");

        let record = classify(raw.clone());
        assert_eq!(record.category(), ErrorCategory::Permission);
        assert!(!record.is_retryable());
        assert!(record.message().ends_with("network admins only\"}"));
        assert!(raw.to_string().starts_with("http: HTTP 403 Forbidden: "));

        assert_eq!(RawFailure::text("HTTP 400").with_detail("  ").detail(), None);
    }

    #[test]
    fn test_not_found_suggestion() {
        let record = classify("404");
        assert_eq!(record.suggestions()[0], MAY_HAVE_MOVED);
    }

    /// Validates `ErrorClassifier::classify` behavior for the offline override
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the category still follows the message.
    /// - Confirms suggestions are replaced with connectivity guidance.
    #[test]
    fn test_offline_overrides_suggestions() {
        let record = ErrorClassifier::new().classify(&RawFailure::from("HTTP 403"), true);
        assert_eq!(record.category(), ErrorCategory::Permission);
        assert_eq!(record.suggestions(), &[OFFLINE_HINT.to_string(), OFFLINE_SYNC.to_string()]);
    }

    #[test]
    fn test_retryable_categories() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Server.is_retryable());
        for category in [
            ErrorCategory::Authentication,
            ErrorCategory::Permission,
            ErrorCategory::Validation,
            ErrorCategory::Unknown,
        ] {
            assert!(!category.is_retryable());
        }
    }

    #[test]
    fn test_io_error_connection_refused_is_network() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(RawFailure::from(io).kind(), FailureKind::Network);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = classify("HTTP 500").with_support_id("err_1_abc");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["category"], "server");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["supportId"], "err_1_abc");
    }

    #[test]
    fn test_record_error_classification() {
        let record = classify("HTTP 401");
        assert!(!ErrorClassification::is_retryable(&record));
        assert_eq!(ErrorClassification::severity(&record), ErrorSeverity::Error);
    }
}
