//! Sync request, page and result types

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::remote::RemoteEvent;
use crate::errors::{CalSyncError, Result};
use crate::impl_vocabulary_conversions;

/// Local feed bound to one remote calendar
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarFeed {
    pub id: String,
    /// Remote calendar id; `None` targets the account's default calendar
    #[serde(default)]
    pub calendar_id: Option<String>,
}

impl CalendarFeed {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), calendar_id: None }
    }

    pub fn with_calendar(id: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self { id: id.into(), calendar_id: Some(calendar_id.into()) }
    }
}

/// Half-open time range `[start, end)` bounding full fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Window reaching `lookback_days` before and `lookahead_days` after
    /// `reference`.
    ///
    /// Returns `CalSyncError::Config` when either bound falls outside the
    /// representable date range.
    pub fn around(
        reference: DateTime<Utc>,
        lookback_days: u32,
        lookahead_days: u32,
    ) -> Result<Self> {
        let start = reference
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .ok_or_else(|| {
                CalSyncError::Config(format!("lookback of {lookback_days} days is out of range"))
            })?;
        let end = reference
            .checked_add_signed(Duration::days(i64::from(lookahead_days)))
            .ok_or_else(|| {
                CalSyncError::Config(format!("lookahead of {lookahead_days} days is out of range"))
            })?;
        Ok(Self { start, end })
    }
}

// ============================================================================
// Paging
// ============================================================================

/// One request against the provider's event collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// First page of a full fetch, bounded by a window
    Window { calendar_id: Option<String>, window: SyncWindow },
    /// First page of an incremental fetch
    Delta { calendar_id: Option<String>, token: String },
    /// Opaque continuation link from the previous page
    NextLink(String),
}

/// One page of the provider's event collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    /// External ids the provider reports as deleted
    pub removed_ids: Vec<String>,
    pub next_link: Option<String>,
    pub delta_link: Option<String>,
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Window-bounded fetch, no prior token
    Full,
    /// Delta fetch from a prior token
    Incremental,
    /// Local events cleared before a window-bounded fetch
    ForcedFull,
}

impl_vocabulary_conversions!(SyncMode {
    Full => "full",
    Incremental => "incremental",
    ForcedFull => "forced_full",
});

impl SyncMode {
    pub fn is_full(self) -> bool {
        !matches!(self, Self::Incremental)
    }
}

/// Per-invocation write counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl ReconcileStats {
    /// Rows inserted, updated or deleted.
    pub fn changed(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Outcome of one sync invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub processed_external_ids: BTreeSet<String>,
    /// Token for the next run; `None` forces the next run into full mode
    pub next_sync_token: Option<String>,
    pub mode: SyncMode,
    pub stats: ReconcileStats,
}

/// Stored sync bookkeeping for one feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSyncState {
    pub feed_id: String,
    pub sync_token: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_full_sync_at: Option<DateTime<Utc>>,
}

impl FeedSyncState {
    pub fn new(feed_id: impl Into<String>) -> Self {
        Self { feed_id: feed_id.into(), sync_token: None, last_sync_at: None, last_full_sync_at: None }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn window_around_reference() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let window = SyncWindow::around(now, 365, 30).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn oversized_window_is_a_config_error() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert!(matches!(SyncWindow::around(now, u32::MAX, 30), Err(CalSyncError::Config(_))));
        assert!(matches!(SyncWindow::around(now, 30, u32::MAX), Err(CalSyncError::Config(_))));
    }

    #[test]
    fn only_incremental_mode_is_not_full() {
        assert!(SyncMode::Full.is_full());
        assert!(SyncMode::ForcedFull.is_full());
        assert!(!SyncMode::Incremental.is_full());
        assert_eq!(SyncMode::ForcedFull.to_string(), "forced_full");
    }
}
