//! Conversions from external infrastructure errors into domain errors.

use calsync_domain::CalSyncError;
use reqwest::Error as HttpError;
use reqwest::StatusCode;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CalSyncError);

impl From<InfraError> for CalSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CalSyncError> for InfraError {
    fn from(value: CalSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCalSyncError {
    fn into_calsync(self) -> CalSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CalSyncError */
/* -------------------------------------------------------------------------- */

impl IntoCalSyncError for SqlError {
    fn into_calsync(self) -> CalSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => CalSyncError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        CalSyncError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        CalSyncError::Database(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => CalSyncError::Database(format!(
                        "foreign key constraint violation: {message}"
                    )),
                    _ => CalSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => CalSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                CalSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                CalSyncError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => CalSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => CalSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_calsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CalSyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(CalSyncError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → CalSyncError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(CalSyncError::InvalidInput(format!("invalid JSON payload: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CalSyncError */
/* -------------------------------------------------------------------------- */

impl IntoCalSyncError for HttpError {
    fn into_calsync(self) -> CalSyncError {
        if self.is_timeout() {
            return CalSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CalSyncError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_to_error(status, None);
        }

        if self.is_decode() {
            return CalSyncError::InvalidInput(format!("malformed provider response: {self}"));
        }

        CalSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_calsync())
    }
}

/// Map a non-success HTTP status to the domain error, optionally carrying
/// the provider's error message.
pub fn status_to_error(status: StatusCode, detail: Option<&str>) -> CalSyncError {
    let code = status.as_u16();
    let mut message = format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
    if let Some(detail) = detail.filter(|d| !d.is_empty()) {
        message.push_str(": ");
        message.push_str(detail);
    }

    match code {
        401 | 403 => CalSyncError::Auth(message),
        404 => CalSyncError::NotFound(message),
        410 => CalSyncError::SyncTokenExpired(message),
        429 => CalSyncError::Network(message),
        400..=499 => CalSyncError::InvalidInput(message),
        _ => CalSyncError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
