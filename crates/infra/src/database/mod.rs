//! SQLite persistence for synced events and per-feed sync state

pub mod calendar_event_repository;
pub mod manager;
pub mod sync_state_repository;

pub use calendar_event_repository::SqliteCalendarEventRepository;
pub use manager::{DbConnection, DbManager, DbPool};
pub use sync_state_repository::SqliteSyncStateRepository;
