//! Error types used throughout the application

use clubhouse_common::resilience::RawFailure;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Clubhouse
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ClubhouseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-success answer from the remote API: `HTTP <status> <reason>`,
    /// optionally followed by `: <body excerpt>`
    #[error("{0}")]
    Remote(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Clubhouse operations
pub type Result<T> = std::result::Result<T, ClubhouseError>;

impl From<ClubhouseError> for RawFailure {
    fn from(err: ClubhouseError) -> Self {
        // Only the status line is classified; payloads ride along as detail.
        match err {
            ClubhouseError::Network(message) => Self::network(message),
            ClubhouseError::Remote(message) => match message.split_once(": ") {
                Some((status, body)) => Self::error("http", status).with_detail(body),
                None => Self::error("http", message),
            },
            ClubhouseError::Auth(message) => {
                Self::error("auth", "401 unauthorized").with_detail(message)
            }
            ClubhouseError::NotFound(message) => {
                Self::error("lookup", "404 not found").with_detail(message)
            }
            ClubhouseError::Validation(message) => {
                Self::error("validation", "400 invalid input").with_detail(message)
            }
            ClubhouseError::Config(message) => {
                Self::error("config", "Configuration error").with_detail(message)
            }
            ClubhouseError::Storage(message) => {
                Self::error("storage", "Storage error").with_detail(message)
            }
            ClubhouseError::Internal(message) => {
                Self::error("clubhouse", "Internal error").with_detail(message)
            }
        }
    }
}
