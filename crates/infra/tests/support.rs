//! Shared helpers for infra integration tests

#![allow(dead_code)]

use std::sync::{Arc, Once};

use calsync_domain::CalendarFeed;
use calsync_infra::database::DbManager;
use calsync_infra::{GraphCalendarClient, HttpClient, StaticAccessToken};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const FEED_ID: &str = "feed-1";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a migrated database in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("calsync-test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init();
        }
    });
}

pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

pub fn feed() -> CalendarFeed {
    CalendarFeed::new(FEED_ID)
}

/// Graph client pointed at a mock server, retrying quickly.
pub fn graph_client(server_uri: &str) -> GraphCalendarClient {
    let http = HttpClient::builder()
        .base_backoff(std::time::Duration::from_millis(5))
        .max_attempts(2)
        .build()
        .expect("http client should build");
    GraphCalendarClient::new(
        http,
        &format!("{server_uri}/v1.0"),
        50,
        Arc::new(StaticAccessToken::new(ACCESS_TOKEN)),
    )
    .expect("graph client should build")
}

pub fn graph_single(id: &str, subject: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "type": "singleInstance",
        "subject": subject,
        "bodyPreview": "",
        "start": { "dateTime": start, "timeZone": "UTC" },
        "end": { "dateTime": end, "timeZone": "UTC" },
        "isAllDay": false,
        "isCancelled": false,
        "showAs": "busy",
        "organizer": { "emailAddress": { "name": "Ada", "address": "ada@example.com" } },
        "attendees": [],
        "createdDateTime": "2025-01-02T10:00:00.1234567Z",
        "lastModifiedDateTime": "2025-01-03T10:00:00.7654321Z"
    })
}

pub fn graph_weekly_master(id: &str) -> Value {
    json!({
        "id": id,
        "type": "seriesMaster",
        "subject": "Team sync",
        "start": { "dateTime": "2025-01-06T09:00:00.0000000", "timeZone": "UTC" },
        "end": { "dateTime": "2025-01-06T09:30:00.0000000", "timeZone": "UTC" },
        "recurrence": {
            "pattern": {
                "type": "weekly",
                "interval": 1,
                "daysOfWeek": ["monday", "wednesday"],
                "firstDayOfWeek": "sunday",
                "index": "first"
            },
            "range": {
                "type": "noEnd",
                "startDate": "2025-01-06",
                "endDate": "0001-01-01",
                "recurrenceTimeZone": "UTC",
                "numberOfOccurrences": 0
            }
        }
    })
}

pub fn graph_occurrence(id: &str, master_id: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "type": "occurrence",
        "seriesMasterId": master_id,
        "subject": "Team sync",
        "start": { "dateTime": start, "timeZone": "UTC" },
        "end": { "dateTime": end, "timeZone": "UTC" }
    })
}

pub fn graph_removed(id: &str) -> Value {
    json!({ "id": id, "@removed": { "reason": "deleted" } })
}

/// A Graph collection page body.
pub fn graph_page(items: Vec<Value>, next_link: Option<String>, delta_link: Option<String>) -> Value {
    let mut body = json!({ "value": items });
    if let Some(next) = next_link {
        body["@odata.nextLink"] = Value::String(next);
    }
    if let Some(delta) = delta_link {
        body["@odata.deltaLink"] = Value::String(delta);
    }
    body
}
