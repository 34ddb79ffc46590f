//! Top-level sync coordinator
//!
//! One invocation runs `FetchBulk → PartitionEvents → ExpandRecurring →
//! Reconcile` sequentially. Masters that the bulk listing only references
//! from their occurrences are fetched by id before expansion. A forced full
//! sync clears the feed's local events once every fetch has succeeded, so a
//! failed fetch never leaves the feed empty. An incremental run whose token
//! the provider rejects as expired is restarted once as a forced full sync.

use std::collections::HashMap;
use std::sync::Arc;

use calsync_domain::{CalendarFeed, Result, SyncConfig, SyncMode, SyncResult, SyncWindow};
use tracing::{info, instrument, warn};

use super::fetcher::PagedFetcher;
use super::partition::partition;
use super::ports::{CalendarEventRepository, CalendarProviderClient, Clock};
use super::reconciler::{EventReconciler, ReconcileBatch};

pub struct SyncOrchestrator {
    fetcher: PagedFetcher,
    reconciler: EventReconciler,
    repository: Arc<dyn CalendarEventRepository>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(
        provider: Arc<dyn CalendarProviderClient>,
        repository: Arc<dyn CalendarEventRepository>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            fetcher: PagedFetcher::new(provider, config.max_pages),
            reconciler: EventReconciler::new(Arc::clone(&repository), Arc::clone(&clock)),
            repository,
            clock,
            config,
        }
    }

    /// Sync one feed.
    ///
    /// Callers persist `next_sync_token` for the following run; a `None`
    /// token means the next run must be full. Any fetch failure aborts the
    /// invocation before anything is reconciled.
    #[instrument(skip(self, feed, prior_token), fields(feed_id = %feed.id))]
    pub async fn sync(
        &self,
        feed: &CalendarFeed,
        prior_token: Option<&str>,
        force_full: bool,
    ) -> Result<SyncResult> {
        let mode = match (prior_token, force_full) {
            (_, true) => SyncMode::ForcedFull,
            (Some(_), false) => SyncMode::Incremental,
            (None, false) => SyncMode::Full,
        };

        match self.run(feed, prior_token, mode).await {
            Err(e) if mode == SyncMode::Incremental && e.is_sync_token_expired() => {
                warn!(error = %e, "sync token expired; restarting as forced full sync");
                self.run(feed, None, SyncMode::ForcedFull).await
            }
            other => other,
        }
    }

    async fn run(
        &self,
        feed: &CalendarFeed,
        prior_token: Option<&str>,
        mode: SyncMode,
    ) -> Result<SyncResult> {
        info!(mode = %mode, "starting calendar sync");
        let window = SyncWindow::around(
            self.clock.now(),
            self.config.lookback_days,
            self.config.lookahead_days,
        )?;
        let calendar_id = feed.calendar_id.as_deref();
        let force_full = mode.is_full();

        // FetchBulk
        let outcome = self.fetcher.fetch(calendar_id, prior_token, force_full, window).await?;

        // PartitionEvents
        let mut partitioned = partition(outcome.events);
        for master_id in partitioned.unresolved_master_ids() {
            if let Some(master) = self.fetcher.fetch_series_master(&master_id).await? {
                partitioned.masters.push(master);
            }
        }
        if !partitioned.inline_instances.is_empty() {
            info!(
                count = partitioned.inline_instances.len(),
                "ignoring inline instances in favour of per-master expansion"
            );
        }

        // ExpandRecurring
        let mut instances_by_master = HashMap::with_capacity(partitioned.masters.len());
        for master in &partitioned.masters {
            let instances = self.fetcher.fetch_instances(&master.event.id, &window).await?;
            instances_by_master.insert(master.event.id.clone(), instances);
        }

        if mode == SyncMode::ForcedFull {
            let cleared = self.repository.delete_all_events(&feed.id).await?;
            info!(cleared, "cleared local events for forced full sync");
        }

        // Reconcile
        let report = self
            .reconciler
            .reconcile(ReconcileBatch {
                feed_id: feed.id.clone(),
                singles: partitioned.singles,
                masters: partitioned.masters,
                instances_by_master,
                deleted_external_ids: outcome.removed_ids,
            })
            .await;

        info!(
            mode = %mode,
            pages = outcome.pages,
            processed = report.processed_external_ids.len(),
            failed = report.stats.failed,
            has_next_token = outcome.next_token.is_some(),
            "calendar sync completed"
        );

        Ok(SyncResult {
            processed_external_ids: report.processed_external_ids,
            next_sync_token: outcome.next_token,
            mode,
            stats: report.stats,
        })
    }
}
