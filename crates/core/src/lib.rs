//! # calsync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the provider, storage and clock
//! - Recurrence conversion between native patterns and the rule grammar
//! - The paged fetcher, reconciler, orchestrator and feed sync service
//!
//! ## Architecture Principles
//! - Only depends on `calsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod sync;

pub use sync::ports::{
    CalendarEventRepository, CalendarProviderClient, Clock, FixedClock, SyncStateRepository,
    SystemClock,
};
pub use sync::recurrence::{to_internal_rule, to_native_pattern};
pub use sync::{
    EventReconciler, FeedSyncService, FetchOutcome, PagedFetcher, ReconcileBatch,
    ReconcileReport, SyncOrchestrator,
};
