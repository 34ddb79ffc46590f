use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use calsync_core::CalendarProviderClient;
use calsync_domain::{
    CalSyncError, EventPage, PageRequest, RemoteEvent, Result as DomainResult, SyncWindow,
};

/// Scripted provider client.
///
/// Bulk pages are served in order regardless of the request; instance lists
/// and single events are served by id. Every request is recorded for
/// assertions.
#[derive(Default, Clone)]
pub struct FakeProviderClient {
    pages: Arc<Mutex<VecDeque<DomainResult<EventPage>>>>,
    instances: Arc<Mutex<HashMap<String, Vec<RemoteEvent>>>>,
    events: Arc<Mutex<HashMap<String, RemoteEvent>>>,
    failing_masters: Arc<Mutex<HashSet<String>>>,
    expired_tokens: Arc<Mutex<HashSet<String>>>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
    instance_requests: Arc<Mutex<Vec<String>>>,
    event_requests: Arc<Mutex<Vec<String>>>,
    page_delay: Option<Duration>,
}

impl FakeProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page: EventPage) -> Self {
        self.pages.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_page_error(self, error: CalSyncError) -> Self {
        self.pages.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_instances(self, master_id: &str, instances: Vec<RemoteEvent>) -> Self {
        self.instances.lock().unwrap().insert(master_id.to_string(), instances);
        self
    }

    /// Serve `event` from `fetch_event` under its own id.
    pub fn with_event(self, event: RemoteEvent) -> Self {
        self.events.lock().unwrap().insert(event.id.clone(), event);
        self
    }

    pub fn with_failing_instances(self, master_id: &str) -> Self {
        self.failing_masters.lock().unwrap().insert(master_id.to_string());
        self
    }

    /// Delta requests carrying `token` fail with `SyncTokenExpired`.
    pub fn with_expired_token(self, token: &str) -> Self {
        self.expired_tokens.lock().unwrap().insert(token.to_string());
        self
    }

    /// Sleep before serving each page, to widen race windows.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    /// Queue more pages after construction.
    pub fn push_page(&self, page: EventPage) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn instance_requests(&self) -> Vec<String> {
        self.instance_requests.lock().unwrap().clone()
    }

    pub fn event_requests(&self) -> Vec<String> {
        self.event_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarProviderClient for FakeProviderClient {
    async fn fetch_page(&self, request: &PageRequest) -> DomainResult<EventPage> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }

        if let PageRequest::Delta { token, .. } = request {
            if self.expired_tokens.lock().unwrap().contains(token) {
                return Err(CalSyncError::SyncTokenExpired(format!("token {} expired", token)));
            }
        }

        self.pages.lock().unwrap().pop_front().unwrap_or_else(|| Ok(EventPage::default()))
    }

    async fn fetch_instances(
        &self,
        master_external_id: &str,
        _window: &SyncWindow,
    ) -> DomainResult<Vec<RemoteEvent>> {
        self.instance_requests.lock().unwrap().push(master_external_id.to_string());

        if self.failing_masters.lock().unwrap().contains(master_external_id) {
            return Err(CalSyncError::Network(format!(
                "instances for {} unavailable",
                master_external_id
            )));
        }

        Ok(self.instances.lock().unwrap().get(master_external_id).cloned().unwrap_or_default())
    }

    async fn fetch_event(&self, external_id: &str) -> DomainResult<Option<RemoteEvent>> {
        self.event_requests.lock().unwrap().push(external_id.to_string());
        Ok(self.events.lock().unwrap().get(external_id).cloned())
    }
}
