//! Conversions from external infrastructure errors into domain errors.

use clubhouse_common::resilience::StoreError;
use clubhouse_domain::ClubhouseError;
use reqwest::{Error as HttpError, StatusCode};
use rusqlite::Error as SqlError;
use thiserror::Error;

/// Longest response body excerpt carried in an error message
const BODY_EXCERPT_CHARS: usize = 200;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub ClubhouseError);

impl From<InfraError> for ClubhouseError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<InfraError> for StoreError {
    fn from(value: InfraError) -> Self {
        StoreError::Unavailable(value.0.to_string())
    }
}

trait IntoClubhouseError {
    fn into_clubhouse(self) -> ClubhouseError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → ClubhouseError */
/* -------------------------------------------------------------------------- */

impl IntoClubhouseError for SqlError {
    fn into_clubhouse(self) -> ClubhouseError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => ClubhouseError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        ClubhouseError::Storage("database is locked".into())
                    }
                    ErrorCode::CannotOpen => {
                        ClubhouseError::Storage(format!("unable to open database: {message}"))
                    }
                    _ => ClubhouseError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => ClubhouseError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                ClubhouseError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                ClubhouseError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => ClubhouseError::Storage(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => ClubhouseError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_clubhouse())
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(ClubhouseError::Storage(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ClubhouseError */
/* -------------------------------------------------------------------------- */

impl IntoClubhouseError for HttpError {
    fn into_clubhouse(self) -> ClubhouseError {
        if self.is_timeout() {
            return ClubhouseError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return ClubhouseError::Network(format!("HTTP connection failure: {self}"));
        }

        if let Some(status) = self.status() {
            return ClubhouseError::Remote(status_message(status, ""));
        }

        if self.is_decode() {
            return ClubhouseError::Internal(format!("malformed response body: {self}"));
        }

        ClubhouseError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_clubhouse())
    }
}

/// `HTTP <code> <reason>: <body excerpt>` for a non-success answer
///
/// Server errors are tagged `(server error)` so reasons such as
/// "Service Unavailable" still classify as server failures. Only the part
/// before the first `": "` is classified; the body excerpt is detail.
pub fn status_message(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let mut message = format!("HTTP {} {}", status.as_u16(), reason);
    if status.is_server_error() {
        message.push_str(" (server error)");
    }

    let body = body.trim();
    if !body.is_empty() {
        let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
        message.push_str(": ");
        message.push_str(&excerpt);
        if body.chars().count() > BODY_EXCERPT_CHARS {
            message.push('…');
        }
    }
    message
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
