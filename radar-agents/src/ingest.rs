//! Ingestion refresh
//!
//! Sources are fetched concurrently. Their items then pass one at a time
//! through dedup, categorization, scoring and insert on a blocking thread, so
//! every dedup check sees the items stored just before it.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use radar_core::{categorize, score, ContentItem};
use radar_store::{DedupConfig, DedupGate, Ledger};

use crate::{AgentError, SharedConfig, SharedSource};

/// Counters for one refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub fetched: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub failed_sources: Vec<String>,
}

/// Fetch → dedup → score → store
pub struct IngestPipeline {
    ledger: Arc<Ledger>,
    sources: Vec<SharedSource>,
    config: SharedConfig,
    dedup: DedupConfig,
    max_concurrent: usize,
}

impl IngestPipeline {
    pub fn new(ledger: Arc<Ledger>, config: SharedConfig) -> Self {
        Self {
            ledger,
            sources: Vec::new(),
            config,
            dedup: DedupConfig::default(),
            max_concurrent: 4,
        }
    }

    pub fn with_source(mut self, source: SharedSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_dedup(mut self, dedup: DedupConfig) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Run one refresh over every source
    ///
    /// A failing source is logged and skipped. Ledger errors abort the refresh.
    pub async fn refresh(&self) -> Result<IngestReport, AgentError> {
        let mut report = IngestReport::default();

        let results: Vec<(String, Result<Vec<ContentItem>, AgentError>)> =
            stream::iter(self.sources.iter().cloned())
                .map(|source| async move {
                    let result = source.fetch().await;
                    (source.name().to_string(), result)
                })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;

        let mut batch = Vec::new();
        for (name, result) in results {
            match result {
                Ok(items) => batch.extend(items),
                Err(e) => {
                    warn!("Source {} failed: {}", name, e);
                    report.failed_sources.push(name);
                }
            }
        }
        report.fetched = batch.len();

        // Similarity checks are CPU-bound; keep them off the async workers
        let ledger = self.ledger.clone();
        let config = self.config.clone();
        let dedup = self.dedup.clone();
        let (stored, duplicates) = tokio::task::spawn_blocking(move || {
            let mut counts = (0usize, 0usize);
            for item in batch {
                if store_candidate(&ledger, &config, &dedup, item)? {
                    counts.0 += 1;
                } else {
                    counts.1 += 1;
                }
            }
            Ok::<_, AgentError>(counts)
        })
        .await
        .map_err(|e| AgentError::Task(e.to_string()))??;
        report.stored = stored;
        report.duplicates = duplicates;

        info!(
            "Ingestion refresh: {} fetched, {} stored, {} duplicates",
            report.fetched, report.stored, report.duplicates
        );
        Ok(report)
    }

    /// Dedup, score and insert one candidate; false when it was a duplicate
    pub fn ingest_item(&self, item: ContentItem) -> Result<bool, AgentError> {
        store_candidate(&self.ledger, &self.config, &self.dedup, item)
    }
}

/// Items arriving without categories are tagged from their text
fn store_candidate(
    ledger: &Ledger,
    config: &SharedConfig,
    dedup: &DedupConfig,
    mut item: ContentItem,
) -> Result<bool, AgentError> {
    let gate = DedupGate::new(ledger, dedup.clone());
    let preview = body_of(&item.text);
    if let Some(reason) = gate.check(item.title(), &item.url, preview)? {
        debug!(item = %item.id, %reason, "skipping duplicate");
        return Ok(false);
    }

    if item.categories.is_empty() {
        item.categories = categorize(&item.text);
    }

    item.score = {
        let config = config.read();
        score(&item, None, &config)
    };

    match ledger.insert(&item) {
        Ok(()) => Ok(true),
        Err(e) if e.is_conflict() => {
            debug!(item = %item.id, "rejected by ledger: {}", e);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Text after the headline line, if any
fn body_of(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let (_, body) = trimmed.split_once('\n')?;
    let body = body.trim();
    (!body.is_empty()).then_some(body)
}
