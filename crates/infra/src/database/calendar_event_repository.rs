//! SQLite-backed implementation of the `CalendarEventRepository` port.
//!
//! Rows are keyed by the internal id; `(feed_id, external_event_id)` is
//! unique. Instances reference their master through `master_event_id` with
//! `ON DELETE CASCADE`, and deletes additionally remove instances explicitly
//! inside the same transaction so the reported count includes them.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use calsync_core::CalendarEventRepository;
use calsync_domain::{Attendee, CalSyncError, CalendarEvent, EventStatus, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tokio::task;
use tracing::{debug, instrument};

use super::manager::{map_sql_error, DbManager};

const EVENT_COLUMNS: &str = "id, feed_id, external_event_id, title, description, location, \
     start_ts, end_ts, is_all_day, is_recurring, is_master, recurrence_rule, master_event_id, \
     recurring_event_id, status, sequence, organizer_json, attendees_json, remote_created_ts, \
     remote_updated_ts, created_at, updated_at";

const EVENT_UPSERT_SQL: &str = "INSERT INTO calendar_events (
        id, feed_id, external_event_id, title, description, location,
        start_ts, end_ts, is_all_day, is_recurring, is_master, recurrence_rule,
        master_event_id, recurring_event_id, status, sequence, organizer_json,
        attendees_json, remote_created_ts, remote_updated_ts, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
    ON CONFLICT(id) DO UPDATE SET
        feed_id = excluded.feed_id,
        external_event_id = excluded.external_event_id,
        title = excluded.title,
        description = excluded.description,
        location = excluded.location,
        start_ts = excluded.start_ts,
        end_ts = excluded.end_ts,
        is_all_day = excluded.is_all_day,
        is_recurring = excluded.is_recurring,
        is_master = excluded.is_master,
        recurrence_rule = excluded.recurrence_rule,
        master_event_id = excluded.master_event_id,
        recurring_event_id = excluded.recurring_event_id,
        status = excluded.status,
        sequence = excluded.sequence,
        organizer_json = excluded.organizer_json,
        attendees_json = excluded.attendees_json,
        remote_created_ts = excluded.remote_created_ts,
        remote_updated_ts = excluded.remote_updated_ts,
        updated_at = excluded.updated_at";

/// SQLite repository for synced calendar events.
pub struct SqliteCalendarEventRepository {
    db: Arc<DbManager>,
}

impl SqliteCalendarEventRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CalendarEventRepository for SqliteCalendarEventRepository {
    #[instrument(skip(self))]
    async fn find_event(
        &self,
        feed_id: &str,
        external_event_id: &str,
        is_master: Option<bool>,
    ) -> Result<Option<CalendarEvent>> {
        let db = Arc::clone(&self.db);
        let feed_id = feed_id.to_string();
        let external_event_id = external_event_id.to_string();
        task::spawn_blocking(move || -> Result<Option<CalendarEvent>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events
                 WHERE feed_id = ?1 AND external_event_id = ?2 AND (?3 IS NULL OR is_master = ?3)"
            );
            conn.query_row(&sql, params![feed_id, external_event_id, is_master], map_event_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, event), fields(external_id = %event.external_event_id, id = %event.id))]
    async fn upsert_event(&self, event: CalendarEvent) -> Result<CalendarEvent> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<CalendarEvent> {
            let conn = db.get_connection()?;
            insert_or_update(&conn, &event)?;
            debug!("calendar event upserted");
            Ok(event)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn list_instances(&self, master_id: &str) -> Result<Vec<CalendarEvent>> {
        let db = Arc::clone(&self.db);
        let master_id = master_id.to_string();
        task::spawn_blocking(move || -> Result<Vec<CalendarEvent>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events
                 WHERE master_event_id = ?1
                 ORDER BY start_ts, external_event_id"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt.query_map(params![master_id], map_event_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, id: &str) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            let instances = tx
                .execute("DELETE FROM calendar_events WHERE master_event_id = ?1", params![id])
                .map_err(map_sql_error)?;
            let own = tx
                .execute("DELETE FROM calendar_events WHERE id = ?1", params![id])
                .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)?;

            debug!(instances, removed = own + instances, "calendar event deleted");
            Ok(own + instances)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn delete_all_events(&self, feed_id: &str) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let feed_id = feed_id.to_string();
        task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            let instances = tx
                .execute(
                    "DELETE FROM calendar_events WHERE feed_id = ?1 AND master_event_id IS NOT NULL",
                    params![feed_id],
                )
                .map_err(map_sql_error)?;
            let rest = tx
                .execute("DELETE FROM calendar_events WHERE feed_id = ?1", params![feed_id])
                .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(instances + rest)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn list_events(&self, feed_id: &str) -> Result<Vec<CalendarEvent>> {
        let db = Arc::clone(&self.db);
        let feed_id = feed_id.to_string();
        task::spawn_blocking(move || -> Result<Vec<CalendarEvent>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events
                 WHERE feed_id = ?1
                 ORDER BY start_ts, external_event_id"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt.query_map(params![feed_id], map_event_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn insert_or_update(conn: &Connection, event: &CalendarEvent) -> Result<()> {
    let organizer_json = event
        .organizer
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| CalSyncError::InvalidInput(format!("organizer not serializable: {e}")))?;
    let attendees_json = serde_json::to_string(&event.attendees)
        .map_err(|e| CalSyncError::InvalidInput(format!("attendees not serializable: {e}")))?;

    let start_ts = event.start_utc.timestamp();
    let end_ts = event.end_utc.timestamp();
    let remote_created_ts = event.remote_created_at.map(|at| at.timestamp());
    let remote_updated_ts = event.remote_updated_at.map(|at| at.timestamp());
    let created_at = event.created_at.timestamp();
    let updated_at = event.updated_at.timestamp();
    let status = event.status.as_str();

    let params: [&dyn ToSql; 22] = [
        &event.id,
        &event.feed_id,
        &event.external_event_id,
        &event.title,
        &event.description,
        &event.location,
        &start_ts,
        &end_ts,
        &event.is_all_day,
        &event.is_recurring,
        &event.is_master,
        &event.recurrence_rule,
        &event.master_event_id,
        &event.recurring_event_id,
        &status,
        &event.sequence,
        &organizer_json,
        &attendees_json,
        &remote_created_ts,
        &remote_updated_ts,
        &created_at,
        &updated_at,
    ];

    conn.execute(EVENT_UPSERT_SQL, params.as_slice()).map_err(map_sql_error)?;
    Ok(())
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    let status_raw: String = row.get(14)?;
    let status = EventStatus::from_str(&status_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, e.into()))?;

    let organizer = row
        .get::<_, Option<String>>(16)?
        .map(|json| serde_json::from_str::<Attendee>(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(16, Type::Text, Box::new(e)))?;
    let attendees_json: String = row.get(17)?;
    let attendees = serde_json::from_str::<Vec<Attendee>>(&attendees_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(17, Type::Text, Box::new(e)))?;

    Ok(CalendarEvent {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        external_event_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        location: row.get(5)?,
        start_utc: timestamp_column(row, 6)?,
        end_utc: timestamp_column(row, 7)?,
        is_all_day: row.get(8)?,
        is_recurring: row.get(9)?,
        is_master: row.get(10)?,
        recurrence_rule: row.get(11)?,
        master_event_id: row.get(12)?,
        recurring_event_id: row.get(13)?,
        status,
        sequence: row.get(15)?,
        organizer,
        attendees,
        remote_created_at: optional_timestamp_column(row, 18)?,
        remote_updated_at: optional_timestamp_column(row, 19)?,
        created_at: timestamp_column(row, 20)?,
        updated_at: timestamp_column(row, 21)?,
    })
}

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<i64>>(idx)?
        .map(|secs| {
            DateTime::from_timestamp(secs, 0)
                .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
        })
        .transpose()
}

pub(crate) fn map_join_error(err: task::JoinError) -> CalSyncError {
    CalSyncError::Internal(format!("database task failed: {err}"))
}
