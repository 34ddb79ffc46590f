//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! sync engine.

// Sync window
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 365;
pub const DEFAULT_MAX_PAGES: usize = 1000;

// Provider client
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;

// Storage
pub const DEFAULT_DB_PATH: &str = "calsync.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Title stored for remote events that arrive without a subject.
pub const UNTITLED_EVENT_TITLE: &str = "Untitled Event";
