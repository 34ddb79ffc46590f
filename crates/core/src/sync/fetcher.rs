//! Paginated retrieval of the remote event collection

use std::collections::HashSet;
use std::sync::Arc;

use calsync_domain::{
    CalSyncError, EventPage, MasterEvent, PageRequest, RemoteEvent, RemoteEventKind, Result,
    SyncWindow,
};
use tracing::{debug, instrument, warn};

use super::ports::CalendarProviderClient;

/// Lazy, finite page sequence starting from one request
///
/// Each call to [`PageStream::next_page`] issues at most one provider request.
/// The stream is exhausted once a page arrives without a next link, or once a
/// request fails. [`PageStream::restart`] rewinds it to the initial request.
pub struct PageStream<'a> {
    client: &'a dyn CalendarProviderClient,
    initial: PageRequest,
    pending: Option<PageRequest>,
    pages_fetched: usize,
}

impl<'a> PageStream<'a> {
    pub fn new(client: &'a dyn CalendarProviderClient, initial: PageRequest) -> Self {
        Self { client, pending: Some(initial.clone()), initial, pages_fetched: 0 }
    }

    /// Fetch the next page, or `None` when the sequence is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<EventPage>> {
        let Some(request) = self.pending.take() else {
            return Ok(None);
        };

        let page = self.client.fetch_page(&request).await?;
        self.pages_fetched += 1;
        self.pending = page.next_link.clone().map(PageRequest::NextLink);

        Ok(Some(page))
    }

    pub fn restart(&mut self) {
        self.pending = Some(self.initial.clone());
        self.pages_fetched = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_none()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

/// Everything one bulk fetch produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub events: Vec<RemoteEvent>,
    /// Tombstoned external ids; only populated for incremental fetches
    pub removed_ids: Vec<String>,
    /// Last delta link seen across all pages
    pub next_token: Option<String>,
    pub incremental: bool,
    pub pages: usize,
}

/// Drives a [`PageStream`] to exhaustion
pub struct PagedFetcher {
    client: Arc<dyn CalendarProviderClient>,
    max_pages: usize,
}

impl PagedFetcher {
    pub fn new(client: Arc<dyn CalendarProviderClient>, max_pages: usize) -> Self {
        Self { client, max_pages: max_pages.max(1) }
    }

    /// Fetch the complete collection.
    ///
    /// With a prior token and `force_full == false` the first request is a
    /// delta request; otherwise it is bounded by `window`. Any failed page
    /// aborts the fetch and nothing is returned.
    #[instrument(skip(self, prior_token, window), fields(incremental = tracing::field::Empty))]
    pub async fn fetch(
        &self,
        calendar_id: Option<&str>,
        prior_token: Option<&str>,
        force_full: bool,
        window: SyncWindow,
    ) -> Result<FetchOutcome> {
        let calendar_id = calendar_id.map(str::to_string);
        let (initial, incremental) = match prior_token {
            Some(token) if !force_full => {
                (PageRequest::Delta { calendar_id, token: token.to_string() }, true)
            }
            _ => (PageRequest::Window { calendar_id, window }, false),
        };
        tracing::Span::current().record("incremental", incremental);

        let mut stream = PageStream::new(self.client.as_ref(), initial);
        let mut collector = PageCollector::default();
        let mut latest_delta_link: Option<String> = None;

        while let Some(page) = stream.next_page().await? {
            debug!(
                page = stream.pages_fetched(),
                events = page.events.len(),
                removed = page.removed_ids.len(),
                has_next = page.next_link.is_some(),
                "fetched event page"
            );

            latest_delta_link = page.delta_link.or(latest_delta_link);

            for event in page.events {
                collector.upsert(event);
            }
            if incremental {
                for id in page.removed_ids {
                    collector.remove(id);
                }
            } else if !page.removed_ids.is_empty() {
                debug!(count = page.removed_ids.len(), "ignoring tombstones on full fetch");
            }

            if !stream.is_exhausted() && stream.pages_fetched() >= self.max_pages {
                warn!(max_pages = self.max_pages, "pagination limit reached; aborting fetch");
                return Err(CalSyncError::Internal(format!(
                    "pagination exceeded {} pages",
                    self.max_pages
                )));
            }
        }

        if latest_delta_link.is_none() {
            debug!("provider issued no delta link; next sync will run in full mode");
        }

        Ok(FetchOutcome {
            events: collector.events,
            removed_ids: collector.removed,
            next_token: latest_delta_link,
            incremental,
            pages: stream.pages_fetched(),
        })
    }

    /// Fetch every occurrence of one master within `window`.
    #[instrument(skip(self, window))]
    pub async fn fetch_instances(
        &self,
        master_external_id: &str,
        window: &SyncWindow,
    ) -> Result<Vec<RemoteEvent>> {
        let instances = self.client.fetch_instances(master_external_id, window).await?;
        debug!(count = instances.len(), "fetched master instances");
        Ok(instances)
    }

    /// Fetch a series master that the bulk listing only referenced by id.
    ///
    /// `None` when the provider no longer knows the id, or when the event it
    /// returns carries no recurrence.
    #[instrument(skip(self))]
    pub async fn fetch_series_master(&self, external_id: &str) -> Result<Option<MasterEvent>> {
        let Some(event) = self.client.fetch_event(external_id).await? else {
            warn!("referenced series master not found; skipping its occurrences");
            return Ok(None);
        };
        match RemoteEventKind::classify(event) {
            RemoteEventKind::Master(master) => Ok(Some(master)),
            _ => {
                warn!("referenced series master carries no recurrence; skipping");
                Ok(None)
            }
        }
    }
}

/// Merges pages so that the newest report for an id wins
///
/// A delta response may report the same event on more than one page, or
/// report it changed and then removed.
#[derive(Default)]
struct PageCollector {
    events: Vec<RemoteEvent>,
    removed: Vec<String>,
    removed_set: HashSet<String>,
}

impl PageCollector {
    fn upsert(&mut self, event: RemoteEvent) {
        if self.removed_set.remove(&event.id) {
            self.removed.retain(|id| id != &event.id);
        }
        match self.events.iter_mut().find(|existing| existing.id == event.id) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
    }

    fn remove(&mut self, id: String) {
        self.events.retain(|event| event.id != id);
        if self.removed_set.insert(id.clone()) {
            self.removed.push(id);
        }
    }
}
