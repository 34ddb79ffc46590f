//! Port interfaces for calendar synchronization

use async_trait::async_trait;
use calsync_domain::{
    CalendarEvent, EventPage, FeedSyncState, PageRequest, RemoteEvent, Result, SyncWindow,
};
use chrono::{DateTime, Utc};

/// Remote calendar provider
///
/// Implementations own transport concerns: authentication, per-call timeouts
/// and retries. Errors returned here are treated as fetch failures and abort
/// the whole sync.
#[async_trait]
pub trait CalendarProviderClient: Send + Sync {
    /// Fetch one page of the event collection
    async fn fetch_page(&self, request: &PageRequest) -> Result<EventPage>;

    /// Fetch every occurrence of a series master inside `window`
    async fn fetch_instances(
        &self,
        master_external_id: &str,
        window: &SyncWindow,
    ) -> Result<Vec<RemoteEvent>>;

    /// Fetch one event by external id; `None` when the provider no longer
    /// knows it
    async fn fetch_event(&self, external_id: &str) -> Result<Option<RemoteEvent>>;
}

/// Local store for synced calendar events
#[async_trait]
pub trait CalendarEventRepository: Send + Sync {
    /// Find an event by feed and external id.
    ///
    /// `is_master = None` matches either role.
    async fn find_event(
        &self,
        feed_id: &str,
        external_event_id: &str,
        is_master: Option<bool>,
    ) -> Result<Option<CalendarEvent>>;

    /// Insert or update by internal id, returning the stored row
    async fn upsert_event(&self, event: CalendarEvent) -> Result<CalendarEvent>;

    /// Instances linked to the stored master with internal id `master_id`
    async fn list_instances(&self, master_id: &str) -> Result<Vec<CalendarEvent>>;

    /// Delete an event; deleting a master also deletes its instances in the
    /// same transaction. Returns the number of rows removed.
    async fn delete_event(&self, id: &str) -> Result<usize>;

    /// Delete every event of a feed
    async fn delete_all_events(&self, feed_id: &str) -> Result<usize>;

    /// All events of a feed, ordered by start time
    async fn list_events(&self, feed_id: &str) -> Result<Vec<CalendarEvent>>;
}

/// Per-feed sync bookkeeping
#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    async fn get_state(&self, feed_id: &str) -> Result<Option<FeedSyncState>>;

    async fn save_state(&self, state: &FeedSyncState) -> Result<()>;
}

/// Source of the reference instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
