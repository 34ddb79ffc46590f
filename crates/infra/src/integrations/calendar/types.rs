//! Microsoft Graph wire types
//!
//! Only the fields the sync engine reads are modelled. Items are decoded one
//! at a time so a single malformed event does not sink its page.

use calsync_domain::{
    Attendee, CalSyncError, EventStatus, PatternedRecurrence, RemoteDateTime, RemoteEvent,
    ResponseStatus, Result,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of a Graph collection response
#[derive(Debug, Deserialize)]
pub struct GraphPage {
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
    #[serde(rename = "@odata.deltaLink")]
    pub delta_link: Option<String>,
}

/// A decoded collection item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphItem {
    Event(RemoteEvent),
    /// Delta tombstone carrying the removed event's id
    Removed(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEvent {
    pub id: String,
    #[serde(rename = "@removed")]
    pub removed: Option<serde_json::Value>,
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub body: Option<GraphBody>,
    pub location: Option<GraphLocation>,
    pub start: Option<GraphDateTime>,
    pub end: Option<GraphDateTime>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub is_cancelled: bool,
    pub show_as: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub series_master_id: Option<String>,
    pub recurrence: Option<PatternedRecurrence>,
    pub organizer: Option<GraphRecipient>,
    #[serde(default)]
    pub attendees: Vec<GraphAttendee>,
    pub created_date_time: Option<DateTime<Utc>>,
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphBody {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLocation {
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDateTime {
    pub date_time: String,
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecipient {
    pub email_address: GraphEmailAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAttendee {
    pub email_address: GraphEmailAddress,
    pub status: Option<GraphResponse>,
}

#[derive(Debug, Deserialize)]
pub struct GraphEmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GraphResponse {
    pub response: Option<ResponseStatus>,
}

impl GraphItem {
    /// Decode one raw collection item.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let event: GraphEvent = serde_json::from_value(value)
            .map_err(|e| CalSyncError::Conversion(format!("unreadable Graph event: {e}")))?;
        event.into_item()
    }
}

impl GraphEvent {
    pub fn into_item(self) -> Result<GraphItem> {
        if self.removed.is_some() {
            return Ok(GraphItem::Removed(self.id));
        }

        let start = self
            .start
            .ok_or_else(|| CalSyncError::Conversion(format!("event {} has no start", self.id)))?;
        let end = self
            .end
            .ok_or_else(|| CalSyncError::Conversion(format!("event {} has no end", self.id)))?;

        let status = event_status(self.is_cancelled, self.show_as.as_deref());
        let is_master = self.event_type.as_deref() == Some("seriesMaster");
        let body = self
            .body_preview
            .filter(|preview| !preview.trim().is_empty())
            .or_else(|| self.body.and_then(|b| b.content))
            .filter(|content| !content.trim().is_empty());
        let attendees = self
            .attendees
            .into_iter()
            .filter_map(|a| recipient(a.email_address, a.status.and_then(|s| s.response)))
            .collect();

        Ok(GraphItem::Event(RemoteEvent {
            id: self.id,
            title: self.subject,
            body,
            location: self.location.and_then(|l| l.display_name).filter(|l| !l.trim().is_empty()),
            start: RemoteDateTime { date_time: start.date_time, time_zone: start.time_zone },
            end: RemoteDateTime { date_time: end.date_time, time_zone: end.time_zone },
            is_all_day: self.is_all_day,
            status,
            // Occurrences echo their master's pattern on some tenants
            recurrence: if is_master || self.series_master_id.is_none() {
                self.recurrence
            } else {
                None
            },
            series_master_id: self.series_master_id,
            sequence: None,
            organizer: self.organizer.and_then(|o| recipient(o.email_address, None)),
            attendees,
            created_at: self.created_date_time,
            last_modified_at: self.last_modified_date_time,
        }))
    }
}

fn event_status(is_cancelled: bool, show_as: Option<&str>) -> EventStatus {
    if is_cancelled {
        return EventStatus::Cancelled;
    }
    match show_as {
        Some(value) if value.eq_ignore_ascii_case("tentative") => EventStatus::Tentative,
        _ => EventStatus::Confirmed,
    }
}

fn recipient(address: GraphEmailAddress, response: Option<ResponseStatus>) -> Option<Attendee> {
    let email = address.address?.trim().to_string();
    if email.is_empty() {
        return None;
    }
    Some(Attendee { name: address.name.filter(|n| !n.trim().is_empty()), email, response })
}
