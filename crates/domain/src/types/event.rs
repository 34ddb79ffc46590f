//! Persisted calendar event record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_vocabulary_conversions;

/// Calendar event as stored locally
///
/// One flat shape covers three roles: non-recurring events, recurring masters
/// (`is_master`) and instances (`master_event_id` set). Rows are only ever
/// written by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Internal identifier (UUID v7)
    pub id: String,
    pub feed_id: String,
    /// Identifier assigned by the remote provider
    pub external_event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_all_day: bool,
    pub is_recurring: bool,
    /// True only for the canonical definition of a recurring series
    pub is_master: bool,
    /// Internal rule grammar string; `None` for non-recurring events
    pub recurrence_rule: Option<String>,
    /// Internal id of the master row, set on instances only
    pub master_event_id: Option<String>,
    /// External id of the master, duplicated on instances
    pub recurring_event_id: Option<String>,
    pub status: EventStatus,
    pub sequence: Option<i64>,
    pub organizer: Option<Attendee>,
    pub attendees: Vec<Attendee>,
    pub remote_created_at: Option<DateTime<Utc>>,
    pub remote_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Compare everything the remote side controls, ignoring local
    /// bookkeeping (`id`, `created_at`, `updated_at`).
    pub fn has_same_content(&self, other: &Self) -> bool {
        self.feed_id == other.feed_id
            && self.external_event_id == other.external_event_id
            && self.title == other.title
            && self.description == other.description
            && self.location == other.location
            && self.start_utc == other.start_utc
            && self.end_utc == other.end_utc
            && self.is_all_day == other.is_all_day
            && self.is_recurring == other.is_recurring
            && self.is_master == other.is_master
            && self.recurrence_rule == other.recurrence_rule
            && self.master_event_id == other.master_event_id
            && self.recurring_event_id == other.recurring_event_id
            && self.status == other.status
            && self.sequence == other.sequence
            && self.organizer == other.organizer
            && self.attendees == other.attendees
            && self.remote_created_at == other.remote_created_at
            && self.remote_updated_at == other.remote_updated_at
    }

    /// True for an occurrence that belongs to a master row.
    pub fn is_instance(&self) -> bool {
        self.master_event_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl_vocabulary_conversions!(EventStatus {
    Confirmed => "confirmed",
    Tentative => "tentative",
    Cancelled => "cancelled",
});

/// Organizer or attendee snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: Option<String>,
    pub email: String,
    pub response: Option<ResponseStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    #[serde(rename = "none")]
    NoResponse,
    Organizer,
    TentativelyAccepted,
    Accepted,
    Declined,
    NotResponded,
    #[serde(other)]
    Unknown,
}
