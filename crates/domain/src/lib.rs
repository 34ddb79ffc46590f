//! # calsync Domain
//!
//! Business domain types for calendar synchronization.
//!
//! This crate contains:
//! - Persisted and provider-shaped event types
//! - The internal recurrence rule grammar and the native pattern vocabulary
//! - Domain error types and Result definitions
//! - Configuration structures and defaults
//!
//! ## Architecture
//! - No dependencies on other calsync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod rule;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use rule::{Frequency, RecurrenceRule, RuleEnd, Weekday, WeekdayNum};
pub use types::*;
