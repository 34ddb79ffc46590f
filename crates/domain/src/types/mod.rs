//! Domain types and models

pub mod event;
pub mod recurrence;
pub mod remote;
pub mod sync;

pub use event::{Attendee, CalendarEvent, EventStatus, ResponseStatus};
pub use recurrence::{
    DayOfWeek, PatternType, PatternedRecurrence, RangeType, RecurrencePattern, RecurrenceRange,
    WeekIndex,
};
pub use remote::{InstanceEvent, MasterEvent, RemoteDateTime, RemoteEvent, RemoteEventKind};
pub use sync::{
    CalendarFeed, EventPage, FeedSyncState, PageRequest, ReconcileStats, SyncMode, SyncResult,
    SyncWindow,
};
