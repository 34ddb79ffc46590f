//! Provider-shaped event data and its classification
//!
//! `RemoteEvent` is what a provider client hands back. It is never persisted
//! directly: the partition step classifies it into [`RemoteEventKind`] and the
//! reconciler projects that into a [`CalendarEvent`](super::CalendarEvent).

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::event::{Attendee, EventStatus};
use super::recurrence::PatternedRecurrence;
use crate::errors::{CalSyncError, Result};

// ============================================================================
// Remote Event
// ============================================================================

/// Event as reported by the remote provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub location: Option<String>,
    pub start: RemoteDateTime,
    pub end: RemoteDateTime,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub status: EventStatus,
    /// Present only on series masters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<PatternedRecurrence>,
    /// Present only on occurrences and exceptions of a series
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_master_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<Attendee>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Wall-clock timestamp plus the zone it is expressed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDateTime {
    /// `YYYY-MM-DDTHH:MM:SS[.fffffff]`, or RFC 3339 with an offset
    pub date_time: String,
    /// IANA zone name; `None` and `"UTC"` both mean UTC
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl RemoteDateTime {
    pub fn utc(date_time: impl Into<String>) -> Self {
        Self { date_time: date_time.into(), time_zone: Some("UTC".to_string()) }
    }

    /// Resolve to a UTC instant.
    ///
    /// A local time that is ambiguous across a DST fold resolves to the
    /// earlier instant; one that falls into a DST gap is rejected.
    pub fn to_utc(&self) -> Result<DateTime<Utc>> {
        let raw = self.date_time.trim();

        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Ok(with_offset.with_timezone(&Utc));
        }

        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .map_err(|e| {
                CalSyncError::Conversion(format!("malformed timestamp '{}': {}", raw, e))
            })?;

        let zone = match self.time_zone.as_deref().map(str::trim) {
            None | Some("") => return Ok(naive.and_utc()),
            Some(name) if name.eq_ignore_ascii_case("UTC") => return Ok(naive.and_utc()),
            Some(name) => name.parse::<Tz>().map_err(|_| {
                CalSyncError::Conversion(format!("unknown time zone '{}'", name))
            })?,
        };

        match zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => Err(CalSyncError::Conversion(format!(
                "timestamp '{}' does not exist in time zone '{}'",
                raw, zone
            ))),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// A remote event sorted into the role it plays in a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEventKind {
    NonRecurring(RemoteEvent),
    Master(MasterEvent),
    Instance(InstanceEvent),
}

/// Series master with its recurrence descriptor pulled out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEvent {
    pub event: RemoteEvent,
    pub recurrence: PatternedRecurrence,
}

/// Occurrence that references its series master
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceEvent {
    pub event: RemoteEvent,
    pub series_master_id: String,
}

impl RemoteEventKind {
    /// Classify by structure: a recurrence descriptor makes a master, a
    /// series-master reference makes an instance, neither makes a single.
    pub fn classify(mut event: RemoteEvent) -> Self {
        if let Some(recurrence) = event.recurrence.take() {
            return Self::Master(MasterEvent { event, recurrence });
        }
        match event.series_master_id.clone() {
            Some(series_master_id) => Self::Instance(InstanceEvent { event, series_master_id }),
            None => Self::NonRecurring(event),
        }
    }

    pub fn external_id(&self) -> &str {
        match self {
            Self::NonRecurring(event) => &event.id,
            Self::Master(master) => &master.event.id,
            Self::Instance(instance) => &instance.event.id,
        }
    }
}
