use std::sync::Arc;

use calsync_core::{FixedClock, SyncOrchestrator};
use calsync_domain::{
    CalendarFeed, DayOfWeek, EventPage, EventStatus, PatternType, PatternedRecurrence, RangeType,
    RecurrencePattern, RecurrenceRange, RemoteDateTime, RemoteEvent, SyncConfig, WeekIndex,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::provider::FakeProviderClient;
use super::repositories::InMemoryCalendarEventRepository;

pub const FEED_ID: &str = "feed-1";

pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).single().expect("reference time should be valid")
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(reference_time()))
}

pub fn feed() -> CalendarFeed {
    CalendarFeed::new(FEED_ID)
}

pub fn single(id: &str, start: &str, end: &str) -> RemoteEvent {
    RemoteEvent {
        id: id.to_string(),
        title: Some(format!("Event {}", id)),
        body: None,
        location: None,
        start: RemoteDateTime::utc(start),
        end: RemoteDateTime::utc(end),
        is_all_day: false,
        status: EventStatus::Confirmed,
        recurrence: None,
        series_master_id: None,
        sequence: None,
        organizer: None,
        attendees: Vec::new(),
        created_at: None,
        last_modified_at: None,
    }
}

pub fn master(id: &str, recurrence: PatternedRecurrence) -> RemoteEvent {
    let mut event = single(id, "2025-01-06T09:00:00", "2025-01-06T09:30:00");
    event.recurrence = Some(recurrence);
    event
}

pub fn instance(id: &str, master_id: &str, start: &str, end: &str) -> RemoteEvent {
    let mut event = single(id, start, end);
    event.series_master_id = Some(master_id.to_string());
    event
}

fn no_end_from(year: i32, month: u32, day: u32) -> RecurrenceRange {
    let mut range = RecurrenceRange::new(RangeType::NoEnd);
    range.start_date = NaiveDate::from_ymd_opt(year, month, day);
    range
}

/// Weekly on Monday and Wednesday, interval 1.
pub fn weekly_mo_we() -> PatternedRecurrence {
    let mut pattern = RecurrencePattern::new(PatternType::Weekly);
    pattern.interval = Some(1);
    pattern.days_of_week = vec![DayOfWeek::Monday, DayOfWeek::Wednesday];
    PatternedRecurrence { pattern, range: no_end_from(2025, 1, 6) }
}

pub fn daily() -> PatternedRecurrence {
    let mut pattern = RecurrencePattern::new(PatternType::Daily);
    pattern.interval = Some(1);
    PatternedRecurrence { pattern, range: no_end_from(2025, 1, 6) }
}

/// Last Friday of every month.
pub fn monthly_last_friday() -> PatternedRecurrence {
    let mut pattern = RecurrencePattern::new(PatternType::RelativeMonthly);
    pattern.interval = Some(1);
    pattern.days_of_week = vec![DayOfWeek::Friday];
    pattern.index = Some(WeekIndex::Last);
    PatternedRecurrence { pattern, range: no_end_from(2025, 1, 31) }
}

pub fn unsupported() -> PatternedRecurrence {
    PatternedRecurrence {
        pattern: RecurrencePattern::new(PatternType::Unsupported),
        range: no_end_from(2025, 1, 6),
    }
}

pub fn page(events: Vec<RemoteEvent>, next_link: Option<&str>, delta_link: Option<&str>) -> EventPage {
    EventPage {
        events,
        removed_ids: Vec::new(),
        next_link: next_link.map(str::to_string),
        delta_link: delta_link.map(str::to_string),
    }
}

pub fn tombstones(ids: &[&str], delta_link: &str) -> EventPage {
    EventPage {
        events: Vec::new(),
        removed_ids: ids.iter().map(|id| id.to_string()).collect(),
        next_link: None,
        delta_link: Some(delta_link.to_string()),
    }
}

pub fn orchestrator(
    provider: &FakeProviderClient,
    repository: &InMemoryCalendarEventRepository,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        Arc::new(provider.clone()),
        Arc::new(repository.clone()),
        fixed_clock(),
        SyncConfig::default(),
    )
}
