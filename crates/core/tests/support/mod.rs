//! Shared test helpers for `calsync-core` integration tests.
//!
//! In-memory adapters for every port plus fixture builders, so that sync
//! tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod provider;
pub mod repositories;

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Install a test-writer subscriber when `RUST_LOG` is set.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init();
        }
    });
}
