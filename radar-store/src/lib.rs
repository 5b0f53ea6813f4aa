//! Robotics Radar Store
//!
//! Durable state for the curation engine:
//! - SQLite ledger of content items, feedback and topic frequencies
//! - Learned category preferences that outlive the process
//! - The unpublished → published lifecycle and publication queries
//! - Read-only aggregate views for status and analytics
//! - The deduplication gate (exact URL, fuzzy title, fuzzy content)

pub mod analytics;
pub mod dedup;
pub mod error;
pub mod ledger;
pub mod preferences;
pub mod schema;

pub use analytics::*;
pub use dedup::*;
pub use error::*;
pub use ledger::*;
pub use preferences::*;

/// Items created within this many hours are preferred by `next_to_publish`
pub const FRESH_WINDOW_HOURS: i64 = 2;
