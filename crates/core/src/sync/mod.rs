//! Calendar synchronization and recurrence reconciliation

pub mod fetcher;
pub mod orchestrator;
pub mod partition;
pub mod ports;
pub mod reconciler;
pub mod recurrence;
pub mod service;

pub use fetcher::{FetchOutcome, PageStream, PagedFetcher};
pub use orchestrator::SyncOrchestrator;
pub use partition::{partition, PartitionedEvents};
pub use reconciler::{EventReconciler, ReconcileBatch, ReconcileReport};
pub use service::FeedSyncService;
