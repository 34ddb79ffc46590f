//! Feed-level sync entry point
//!
//! Wraps [`SyncOrchestrator`] with token bookkeeping and guarantees at most
//! one in-flight sync per feed.

use std::collections::HashMap;
use std::sync::Arc;

use calsync_domain::{CalendarFeed, FeedSyncState, Result, SyncResult};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::orchestrator::SyncOrchestrator;
use super::ports::{Clock, SyncStateRepository};

pub struct FeedSyncService {
    orchestrator: SyncOrchestrator,
    state_repository: Arc<dyn SyncStateRepository>,
    clock: Arc<dyn Clock>,
    feed_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FeedSyncService {
    pub fn new(
        orchestrator: SyncOrchestrator,
        state_repository: Arc<dyn SyncStateRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { orchestrator, state_repository, clock, feed_locks: Mutex::new(HashMap::new()) }
    }

    /// Sync a feed using its stored token, then store the token the provider
    /// issued. A failed sync leaves the stored state untouched.
    #[instrument(skip(self, feed), fields(feed_id = %feed.id))]
    pub async fn sync_feed(&self, feed: &CalendarFeed, force_full: bool) -> Result<SyncResult> {
        let lock = self.feed_lock(&feed.id).await;
        let result = {
            let _guard = lock.lock().await;
            self.sync_locked(feed, force_full).await
        };
        drop(lock);
        self.release_feed_lock(&feed.id).await;
        result
    }

    async fn sync_locked(&self, feed: &CalendarFeed, force_full: bool) -> Result<SyncResult> {
        let state = self
            .state_repository
            .get_state(&feed.id)
            .await?
            .unwrap_or_else(|| FeedSyncState::new(feed.id.clone()));
        debug!(has_token = state.sync_token.is_some(), "loaded feed sync state");

        let result = self.orchestrator.sync(feed, state.sync_token.as_deref(), force_full).await?;

        let now = self.clock.now();
        let next_state = FeedSyncState {
            sync_token: result.next_sync_token.clone(),
            last_sync_at: Some(now),
            last_full_sync_at: if result.mode.is_full() { Some(now) } else { state.last_full_sync_at },
            ..state
        };
        self.state_repository.save_state(&next_state).await?;

        info!(mode = %result.mode, stored_token = next_state.sync_token.is_some(), "feed sync state saved");
        Ok(result)
    }

    async fn feed_lock(&self, feed_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.feed_locks.lock().await;
        Arc::clone(locks.entry(feed_id.to_string()).or_default())
    }

    /// Drop the feed's lock entry once no caller holds or awaits it.
    async fn release_feed_lock(&self, feed_id: &str) {
        let mut locks = self.feed_locks.lock().await;
        if locks.get(feed_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(feed_id);
        }
    }

    /// Feeds with a sync in flight or queued
    pub async fn active_feed_count(&self) -> usize {
        self.feed_locks.lock().await.len()
    }
}
