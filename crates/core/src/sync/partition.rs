//! Splits a bulk fetch into masters, singles and inline instances

use std::collections::HashSet;

use calsync_domain::{InstanceEvent, MasterEvent, RemoteEvent, RemoteEventKind};

/// Bulk fetch result sorted by role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedEvents {
    pub masters: Vec<MasterEvent>,
    pub singles: Vec<RemoteEvent>,
    /// Occurrences returned inline by the bulk fetch. The orchestrator
    /// ignores these in favour of the per-master instance fetch.
    pub inline_instances: Vec<InstanceEvent>,
}

impl PartitionedEvents {
    /// Series master ids referenced by inline instances but absent from
    /// `masters`, in first-seen order.
    pub fn unresolved_master_ids(&self) -> Vec<String> {
        let mut seen: HashSet<&str> =
            self.masters.iter().map(|master| master.event.id.as_str()).collect();
        self.inline_instances
            .iter()
            .filter(|instance| seen.insert(instance.series_master_id.as_str()))
            .map(|instance| instance.series_master_id.clone())
            .collect()
    }
}

pub fn partition(events: Vec<RemoteEvent>) -> PartitionedEvents {
    let mut partitioned = PartitionedEvents::default();

    for event in events {
        match RemoteEventKind::classify(event) {
            RemoteEventKind::Master(master) => partitioned.masters.push(master),
            RemoteEventKind::NonRecurring(single) => partitioned.singles.push(single),
            RemoteEventKind::Instance(instance) => partitioned.inline_instances.push(instance),
        }
    }

    partitioned
}
