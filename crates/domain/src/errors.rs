//! Error types used throughout the sync engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for calsync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CalSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A recurrence pattern or rule could not be translated.
    #[error("Recurrence conversion error: {0}")]
    Conversion(String),

    /// The provider rejected the continuation token; a full resync is needed.
    #[error("Sync token expired: {0}")]
    SyncTokenExpired(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CalSyncError {
    /// True when the error means the stored continuation token is unusable.
    pub fn is_sync_token_expired(&self) -> bool {
        matches!(self, Self::SyncTokenExpired(_))
    }
}

/// Result type alias for calsync operations
pub type Result<T> = std::result::Result<T, CalSyncError>;
