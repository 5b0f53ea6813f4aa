//! Robotics Radar Agents
//!
//! Everything between the ledger and the outside world:
//! - **Sources**: produce normalized candidate items
//! - **Ingestion**: fetch, dedup, score and store a refresh batch
//! - **Feedback**: validate reviewer feedback, re-score, learn preferences
//! - **Delivery**: hand a selected item to an outbound channel
//! - **Maintenance**: batch re-scoring
//!
//! ## Settings
//!
//! Runtime behavior is configured through one TOML file.
//! See [`settings::Settings`] for the layout.

pub mod delivery;
pub mod feedback;
pub mod ingest;
pub mod maintenance;
pub mod settings;
pub mod sources;
pub mod traits;

pub use delivery::*;
pub use feedback::*;
pub use ingest::*;
pub use maintenance::*;
pub use settings::*;
pub use sources::*;
pub use traits::*;

use parking_lot::RwLock;
use std::sync::Arc;

use radar_core::ScoringConfig;

/// Scoring configuration shared by ingestion and feedback processing
pub type SharedConfig = Arc<RwLock<ScoringConfig>>;
