//! Microsoft Graph calendar integration
//!
//! `GraphCalendarClient` implements the core `CalendarProviderClient` port
//! against the Graph `calendarView/delta` and `instances` endpoints.

pub mod auth;
pub mod microsoft;
pub mod types;

pub use auth::{AccessTokenSource, StaticAccessToken};
pub use microsoft::GraphCalendarClient;
