use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calsync_core::{CalendarEventRepository, SyncStateRepository};
use calsync_domain::{CalSyncError, CalendarEvent, FeedSyncState, Result as DomainResult};

/// In-memory mock for `CalendarEventRepository`.
///
/// Enforces the same constraints as the SQLite schema: one row per
/// (feed, external id), and instances must point at a stored master of the
/// same feed. Upserts for selected external ids can be made to fail.
#[derive(Default, Clone)]
pub struct InMemoryCalendarEventRepository {
    events: Arc<Mutex<Vec<CalendarEvent>>>,
    failing_external_ids: Arc<Mutex<HashSet<String>>>,
    upsert_calls: Arc<Mutex<usize>>,
}

impl InMemoryCalendarEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with existing rows, bypassing constraint checks.
    pub fn with_events(self, events: Vec<CalendarEvent>) -> Self {
        self.events.lock().unwrap().extend(events);
        self
    }

    /// Make every upsert for `external_id` fail with a storage error.
    pub fn fail_upserts_for(&self, external_id: &str) {
        self.failing_external_ids.lock().unwrap().insert(external_id.to_string());
    }

    pub fn snapshot(&self, feed_id: &str) -> Vec<CalendarEvent> {
        let mut rows: Vec<_> =
            self.events.lock().unwrap().iter().filter(|e| e.feed_id == feed_id).cloned().collect();
        rows.sort_by(|a, b| a.start_utc.cmp(&b.start_utc).then(a.external_event_id.cmp(&b.external_event_id)));
        rows
    }

    pub fn by_external_id(&self, feed_id: &str, external_id: &str) -> Option<CalendarEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.feed_id == feed_id && e.external_event_id == external_id)
            .cloned()
    }

    pub fn upsert_calls(&self) -> usize {
        *self.upsert_calls.lock().unwrap()
    }
}

#[async_trait]
impl CalendarEventRepository for InMemoryCalendarEventRepository {
    async fn find_event(
        &self,
        feed_id: &str,
        external_event_id: &str,
        is_master: Option<bool>,
    ) -> DomainResult<Option<CalendarEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.feed_id == feed_id
                    && e.external_event_id == external_event_id
                    && is_master.map_or(true, |flag| e.is_master == flag)
            })
            .cloned())
    }

    async fn upsert_event(&self, event: CalendarEvent) -> DomainResult<CalendarEvent> {
        *self.upsert_calls.lock().unwrap() += 1;

        if self.failing_external_ids.lock().unwrap().contains(&event.external_event_id) {
            return Err(CalSyncError::Database(format!(
                "simulated failure for {}",
                event.external_event_id
            )));
        }

        let mut events = self.events.lock().unwrap();

        let duplicate = events.iter().any(|e| {
            e.id != event.id
                && e.feed_id == event.feed_id
                && e.external_event_id == event.external_event_id
        });
        if duplicate {
            return Err(CalSyncError::Database(format!(
                "UNIQUE constraint failed: calendar_events.feed_id, external_event_id ({})",
                event.external_event_id
            )));
        }

        if let Some(master_id) = &event.master_event_id {
            let master_ok = events
                .iter()
                .any(|e| &e.id == master_id && e.feed_id == event.feed_id && e.is_master);
            if !master_ok {
                return Err(CalSyncError::Database(format!(
                    "FOREIGN KEY constraint failed: master {} not found",
                    master_id
                )));
            }
        }

        match events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event.clone(),
            None => events.push(event.clone()),
        }

        Ok(event)
    }

    async fn list_instances(&self, master_id: &str) -> DomainResult<Vec<CalendarEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.master_event_id.as_deref() == Some(master_id))
            .cloned()
            .collect())
    }

    async fn delete_event(&self, id: &str) -> DomainResult<usize> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != id && e.master_event_id.as_deref() != Some(id));
        Ok(before - events.len())
    }

    async fn delete_all_events(&self, feed_id: &str) -> DomainResult<usize> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.feed_id != feed_id);
        Ok(before - events.len())
    }

    async fn list_events(&self, feed_id: &str) -> DomainResult<Vec<CalendarEvent>> {
        Ok(self.snapshot(feed_id))
    }
}

/// In-memory mock for `SyncStateRepository`.
#[derive(Default, Clone)]
pub struct InMemorySyncStateRepository {
    states: Arc<Mutex<HashMap<String, FeedSyncState>>>,
}

impl InMemorySyncStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, feed_id: &str, token: &str) -> Self {
        let mut state = FeedSyncState::new(feed_id);
        state.sync_token = Some(token.to_string());
        self.states.lock().unwrap().insert(feed_id.to_string(), state);
        self
    }

    pub fn state(&self, feed_id: &str) -> Option<FeedSyncState> {
        self.states.lock().unwrap().get(feed_id).cloned()
    }
}

#[async_trait]
impl SyncStateRepository for InMemorySyncStateRepository {
    async fn get_state(&self, feed_id: &str) -> DomainResult<Option<FeedSyncState>> {
        Ok(self.state(feed_id))
    }

    async fn save_state(&self, state: &FeedSyncState) -> DomainResult<()> {
        self.states.lock().unwrap().insert(state.feed_id.clone(), state.clone());
        Ok(())
    }
}
