//! SQLite-backed implementation of the `SyncStateRepository` port.

use std::sync::Arc;

use async_trait::async_trait;
use calsync_core::SyncStateRepository;
use calsync_domain::{FeedSyncState, Result};
use rusqlite::{params, OptionalExtension};
use tokio::task;
use tracing::instrument;

use super::calendar_event_repository::{map_join_error, optional_timestamp_column};
use super::manager::{map_sql_error, DbManager};

pub struct SqliteSyncStateRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncStateRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncStateRepository for SqliteSyncStateRepository {
    #[instrument(skip(self))]
    async fn get_state(&self, feed_id: &str) -> Result<Option<FeedSyncState>> {
        let db = Arc::clone(&self.db);
        let feed_id = feed_id.to_string();
        task::spawn_blocking(move || -> Result<Option<FeedSyncState>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT feed_id, sync_token, last_sync_at, last_full_sync_at
                 FROM feed_sync_state WHERE feed_id = ?1",
                params![feed_id],
                |row| {
                    Ok(FeedSyncState {
                        feed_id: row.get(0)?,
                        sync_token: row.get(1)?,
                        last_sync_at: optional_timestamp_column(row, 2)?,
                        last_full_sync_at: optional_timestamp_column(row, 3)?,
                    })
                },
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, state), fields(feed_id = %state.feed_id))]
    async fn save_state(&self, state: &FeedSyncState) -> Result<()> {
        let db = Arc::clone(&self.db);
        let state = state.clone();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO feed_sync_state (feed_id, sync_token, last_sync_at, last_full_sync_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(feed_id) DO UPDATE SET
                    sync_token = excluded.sync_token,
                    last_sync_at = excluded.last_sync_at,
                    last_full_sync_at = excluded.last_full_sync_at",
                params![
                    state.feed_id,
                    state.sync_token,
                    state.last_sync_at.map(|at| at.timestamp()),
                    state.last_full_sync_at.map(|at| at.timestamp()),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
