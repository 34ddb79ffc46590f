//! # calsync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite persistence (r2d2 pool, event and sync-state repositories)
//! - A retrying HTTP client and the Microsoft Graph calendar adapter
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `calsync-core`
//! - Contains all "impure" code (I/O, network, filesystem)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

pub use database::{DbManager, SqliteCalendarEventRepository, SqliteSyncStateRepository};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::{AccessTokenSource, GraphCalendarClient, StaticAccessToken};
pub use observability::init_tracing;
