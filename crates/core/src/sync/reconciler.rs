//! Applies remote state to local storage
//!
//! Tombstones run first, then singles, then each master followed by its
//! instances. Stored instances of a master that the fresh instance listing no
//! longer contains are removed. Failures are contained to one item: the item is logged, counted
//! and skipped, and the batch carries on.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use calsync_domain::constants::UNTITLED_EVENT_TITLE;
use calsync_domain::{
    CalSyncError, CalendarEvent, MasterEvent, ReconcileStats, RemoteEvent, Result,
};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::ports::{CalendarEventRepository, Clock};
use super::recurrence::to_internal_rule;

/// Remote state to apply for one feed
#[derive(Debug, Clone, Default)]
pub struct ReconcileBatch {
    pub feed_id: String,
    pub singles: Vec<RemoteEvent>,
    pub masters: Vec<MasterEvent>,
    /// Fetched occurrences keyed by master external id
    pub instances_by_master: HashMap<String, Vec<RemoteEvent>>,
    pub deleted_external_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Every single, master and instance whose processing was attempted
    pub processed_external_ids: BTreeSet<String>,
    pub stats: ReconcileStats,
}

/// How a stored row relates to the remote side
enum Role<'a> {
    Single,
    Master { rule: &'a str },
    Instance { rule: &'a str, master: &'a CalendarEvent },
}

pub struct EventReconciler {
    repository: Arc<dyn CalendarEventRepository>,
    clock: Arc<dyn Clock>,
}

impl EventReconciler {
    pub fn new(repository: Arc<dyn CalendarEventRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    #[instrument(skip(self, batch), fields(feed_id = %batch.feed_id))]
    pub async fn reconcile(&self, batch: ReconcileBatch) -> ReconcileReport {
        let ReconcileBatch { feed_id, singles, masters, mut instances_by_master, deleted_external_ids } =
            batch;
        let now = self.clock.now();
        let mut report = ReconcileReport::default();

        for external_id in &deleted_external_ids {
            match self.apply_tombstone(&feed_id, external_id).await {
                Ok(removed) => report.stats.deleted += removed,
                Err(e) => {
                    warn!(external_id = %external_id, error = %e, "failed to apply tombstone");
                    report.stats.failed += 1;
                }
            }
        }

        for single in &singles {
            report.processed_external_ids.insert(single.id.clone());
            if let Err(e) = self.store(&feed_id, single, Role::Single, now, &mut report.stats).await {
                log_item_failure(&single.id, &e);
                report.stats.failed += 1;
            }
        }

        for master in &masters {
            let master_id = master.event.id.clone();
            let instances = instances_by_master.remove(&master_id).unwrap_or_default();
            report.processed_external_ids.insert(master_id.clone());

            let stored_master = match self.store_master(&feed_id, master, now, &mut report.stats).await
            {
                Ok(stored) => stored,
                Err(e) => {
                    log_item_failure(&master_id, &e);
                    report.stats.failed += 1;
                    if !instances.is_empty() {
                        warn!(
                            external_id = %master_id,
                            skipped = instances.len(),
                            "skipping instances of failed master"
                        );
                    }
                    for instance in &instances {
                        report.processed_external_ids.insert(instance.id.clone());
                        report.stats.failed += 1;
                    }
                    continue;
                }
            };

            let rule = stored_master.recurrence_rule.clone().unwrap_or_default();
            for instance in &instances {
                report.processed_external_ids.insert(instance.id.clone());
                let role = Role::Instance { rule: &rule, master: &stored_master };
                if let Err(e) = self.store(&feed_id, instance, role, now, &mut report.stats).await {
                    log_item_failure(&instance.id, &e);
                    report.stats.failed += 1;
                }
            }

            match self.prune_stale_instances(&stored_master, &instances).await {
                Ok(removed) => report.stats.deleted += removed,
                Err(e) => {
                    warn!(external_id = %master_id, error = %e, "failed to prune stale instances");
                    report.stats.failed += 1;
                }
            }
        }

        for (master_id, instances) in &instances_by_master {
            warn!(
                external_id = %master_id,
                count = instances.len(),
                "instances supplied without their master; ignoring"
            );
        }

        info!(
            processed = report.processed_external_ids.len(),
            created = report.stats.created,
            updated = report.stats.updated,
            unchanged = report.stats.unchanged,
            deleted = report.stats.deleted,
            failed = report.stats.failed,
            "reconciliation finished"
        );

        report
    }

    /// Delete the row for a tombstoned id. Unknown ids are a no-op.
    async fn apply_tombstone(&self, feed_id: &str, external_id: &str) -> Result<usize> {
        match self.repository.find_event(feed_id, external_id, None).await? {
            Some(existing) => {
                let removed = self.repository.delete_event(&existing.id).await?;
                debug!(external_id, removed, "applied tombstone");
                Ok(removed)
            }
            None => {
                debug!(external_id, "tombstone for unknown event; nothing to delete");
                Ok(0)
            }
        }
    }

    /// Delete stored instances of `master` missing from the fetched listing.
    async fn prune_stale_instances(
        &self,
        master: &CalendarEvent,
        fetched: &[RemoteEvent],
    ) -> Result<usize> {
        let fresh: HashSet<&str> = fetched.iter().map(|instance| instance.id.as_str()).collect();
        let mut removed = 0;
        for stale in self
            .repository
            .list_instances(&master.id)
            .await?
            .into_iter()
            .filter(|row| !fresh.contains(row.external_event_id.as_str()))
        {
            removed += self.repository.delete_event(&stale.id).await?;
            debug!(
                external_id = %stale.external_event_id,
                master = %master.external_event_id,
                "removed instance no longer listed by the provider"
            );
        }
        Ok(removed)
    }

    async fn store_master(
        &self,
        feed_id: &str,
        master: &MasterEvent,
        now: DateTime<Utc>,
        stats: &mut ReconcileStats,
    ) -> Result<CalendarEvent> {
        let rule = to_internal_rule(&master.recurrence, now)?;
        self.store(feed_id, &master.event, Role::Master { rule: &rule }, now, stats).await
    }

    /// Upsert by (feed, external id, master flag).
    ///
    /// A stored row with identical content is left alone. A non-master row
    /// is promoted in place when the event became a master; a stored master
    /// whose event lost its recurrence is deleted with its instances first.
    async fn store(
        &self,
        feed_id: &str,
        remote: &RemoteEvent,
        role: Role<'_>,
        now: DateTime<Utc>,
        stats: &mut ReconcileStats,
    ) -> Result<CalendarEvent> {
        let is_master = matches!(role, Role::Master { .. });
        let mut candidate = project(feed_id, remote, role, now)?;

        let mut existing = self.repository.find_event(feed_id, &remote.id, Some(is_master)).await?;
        if existing.is_none() {
            if let Some(other) = self.repository.find_event(feed_id, &remote.id, Some(!is_master)).await? {
                if is_master {
                    debug!(external_id = %remote.id, "promoting stored event to series master");
                    existing = Some(other);
                } else {
                    debug!(external_id = %remote.id, "series lost its recurrence; replacing master");
                    stats.deleted += self.repository.delete_event(&other.id).await?;
                }
            }
        }

        match existing {
            Some(existing) => {
                candidate.id = existing.id.clone();
                candidate.created_at = existing.created_at;
                if existing.has_same_content(&candidate) {
                    stats.unchanged += 1;
                    return Ok(existing);
                }
                let stored = self.repository.upsert_event(candidate).await?;
                debug!(external_id = %remote.id, id = %stored.id, "updated event");
                stats.updated += 1;
                Ok(stored)
            }
            None => {
                let stored = self.repository.upsert_event(candidate).await?;
                debug!(external_id = %remote.id, id = %stored.id, "created event");
                stats.created += 1;
                Ok(stored)
            }
        }
    }
}

/// Flatten a remote event into the persisted shape for its role.
fn project(
    feed_id: &str,
    remote: &RemoteEvent,
    role: Role<'_>,
    now: DateTime<Utc>,
) -> Result<CalendarEvent> {
    // Stored timestamps carry whole seconds only.
    let start_utc = remote.start.to_utc()?.trunc_subsecs(0);
    let end_utc = remote.end.to_utc()?.trunc_subsecs(0);
    let now = now.trunc_subsecs(0);
    if end_utc < start_utc {
        return Err(CalSyncError::Conversion(format!(
            "event {} ends before it starts",
            remote.id
        )));
    }

    let (is_recurring, is_master, recurrence_rule, master_event_id, recurring_event_id) = match role {
        Role::Single => (false, false, None, None, None),
        Role::Master { rule } => (true, true, Some(rule.to_string()), None, None),
        Role::Instance { rule, master } => (
            true,
            false,
            Some(rule.to_string()),
            Some(master.id.clone()),
            Some(master.external_event_id.clone()),
        ),
    };

    let title = remote
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(UNTITLED_EVENT_TITLE)
        .to_string();

    Ok(CalendarEvent {
        id: Uuid::now_v7().to_string(),
        feed_id: feed_id.to_string(),
        external_event_id: remote.id.clone(),
        title,
        description: remote.body.clone(),
        location: remote.location.clone(),
        start_utc,
        end_utc,
        is_all_day: remote.is_all_day,
        is_recurring,
        is_master,
        recurrence_rule,
        master_event_id,
        recurring_event_id,
        status: remote.status,
        sequence: remote.sequence,
        organizer: remote.organizer.clone(),
        attendees: remote.attendees.clone(),
        remote_created_at: remote.created_at.map(|at| at.trunc_subsecs(0)),
        remote_updated_at: remote.last_modified_at.map(|at| at.trunc_subsecs(0)),
        created_at: now,
        updated_at: now,
    })
}

fn log_item_failure(external_id: &str, e: &CalSyncError) {
    match e {
        CalSyncError::Conversion(_) | CalSyncError::InvalidInput(_) => {
            warn!(external_id, error = %e, "skipping event that could not be converted");
        }
        _ => error!(external_id, error = %e, "failed to persist event; skipping"),
    }
}
