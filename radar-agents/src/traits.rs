//! Adapter seams between the engine and the outside world

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use radar_core::{ContentItem, CoreError};
use radar_store::LedgerError;

/// Errors from adapters, ingestion and feedback processing
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Delivery rejected: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Produces candidate items from one upstream source
///
/// Adapters only normalize; they never touch the ledger. Deduplication and
/// scoring happen in the ingestion pipeline.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source name used in logs
    fn name(&self) -> &str;

    /// Fetch the current batch of items
    async fn fetch(&self) -> Result<Vec<ContentItem>, AgentError>;
}

/// Hands a selected item to an outbound channel
#[async_trait]
pub trait DeliveryAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one item; any error counts as a failed delivery
    async fn deliver(&self, item: &ContentItem) -> Result<(), AgentError>;
}

/// Thread-safe reference to a source
pub type SharedSource = Arc<dyn SourceAdapter>;

/// Thread-safe reference to a delivery channel
pub type SharedDelivery = Arc<dyn DeliveryAdapter>;
