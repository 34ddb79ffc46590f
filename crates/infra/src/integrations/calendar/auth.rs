//! Access token sources for provider requests

use async_trait::async_trait;
use calsync_domain::{CalSyncError, Result};

/// Supplies a bearer token for each provider request.
///
/// Implementations that refresh tokens should do so inside
/// `access_token`; the client asks again for every request.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, e.g. one obtained out of band
#[derive(Clone)]
pub struct StaticAccessToken {
    token: String,
}

impl StaticAccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for StaticAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAccessToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl AccessTokenSource for StaticAccessToken {
    async fn access_token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(CalSyncError::Auth("access token is empty".into()));
        }
        Ok(self.token.clone())
    }
}
