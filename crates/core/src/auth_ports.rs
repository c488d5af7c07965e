//! Port interface for API credentials

use async_trait::async_trait;
use clubhouse_domain::Result;

/// Supplies the bearer token sent with remote API calls
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Current token, or `None` for anonymous calls
    async fn access_token(&self) -> Result<Option<String>>;
}
