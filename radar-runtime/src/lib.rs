//! Robotics Radar Runtime
//!
//! Drives the publication loop: an interval gate, an ingestion refresh, the
//! two-tier selection query and delivery through the configured adapter.

pub mod publisher;

pub use publisher::*;
