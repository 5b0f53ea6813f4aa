//! Robotics Radar Core - content model and ranking policy
//!
//! This crate provides the pure, I/O-free primitives:
//! - The canonical content item shared by every source
//! - Feedback vocabulary and tallies
//! - The scoring engine (eligibility gate, base score, feedback and category multipliers)
//! - Category preference learning and rule-based category tagging
//! - String similarity used by the deduplication gate

pub mod categories;
pub mod config;
pub mod feedback;
pub mod item;
pub mod preferences;
pub mod scoring;
pub mod similarity;

pub use categories::*;
pub use config::*;
pub use feedback::*;
pub use item::*;
pub use preferences::*;
pub use scoring::*;
pub use similarity::*;

/// Flat base granted to items without social engagement (feeds, repositories)
pub const ZERO_ENGAGEMENT_BASE: f64 = 100.0;

/// Text length at which the content term saturates
pub const CONTENT_REFERENCE_CHARS: f64 = 280.0;

/// Lowest weight a learned category can reach
pub const MIN_CATEGORY_WEIGHT: f64 = 0.1;

/// Default learning rate for category preferences
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Category that receives rating feedback for items without categories
pub const FALLBACK_CATEGORY: &str = "robotics_general";
