//! HTTP adapters for the club API

pub mod api_client;
pub mod auth;
pub mod client;

pub use api_client::{ClubApiClient, ClubApiConfig};
pub use auth::StaticTokenProvider;
pub use client::{HttpClient, HttpClientBuilder};
