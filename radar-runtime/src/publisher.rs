//! Smart Publisher
//!
//! Interval-gated publication loop. Each due cycle refreshes ingestion, picks
//! the next item (fresh window first, then backlog), delivers it and only then
//! marks it published.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use radar_agents::{AgentError, IngestPipeline, IngestReport, PublisherSettings, SharedDelivery};
use radar_store::{Ledger, LedgerError};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Delivery of {item_id} failed: {reason}")]
    DeliveryFailed { item_id: String, reason: String },

    #[error("Ingestion failed: {0}")]
    Ingest(#[from] AgentError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result of a cycle that completed without error
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The interval has not elapsed; nothing was done
    NotDue { minutes_remaining: f64 },
    Published { item_id: String, ingest: IngestReport },
    NothingToPublish { ingest: IngestReport },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherStatus {
    pub unpublished: u64,
    pub published: u64,
    pub total: u64,
    pub interval_minutes: u64,
    pub last_publish_time: Option<DateTime<Utc>>,
    pub next_publish_in_minutes: Option<f64>,
}

pub struct SmartPublisher {
    ledger: Arc<Ledger>,
    pipeline: IngestPipeline,
    delivery: SharedDelivery,
    settings: PublisherSettings,
    last_publish: Option<DateTime<Utc>>,
}

impl SmartPublisher {
    pub fn new(
        ledger: Arc<Ledger>,
        pipeline: IngestPipeline,
        delivery: SharedDelivery,
        settings: PublisherSettings,
    ) -> Self {
        Self {
            ledger,
            pipeline,
            delivery,
            settings,
            last_publish: None,
        }
    }

    /// Publish interval; out-of-range settings saturate instead of panicking
    pub fn interval(&self) -> ChronoDuration {
        i64::try_from(self.settings.interval_minutes)
            .ok()
            .and_then(ChronoDuration::try_minutes)
            .unwrap_or(ChronoDuration::MAX)
    }

    fn fresh_window(&self) -> ChronoDuration {
        ChronoDuration::try_hours(self.settings.fresh_window_hours).unwrap_or(ChronoDuration::MAX)
    }

    pub fn last_publish_time(&self) -> Option<DateTime<Utc>> {
        self.last_publish
    }

    pub fn should_publish_now(&self) -> bool {
        self.should_publish_at(Utc::now())
    }

    /// True before the first publish or once a full interval has elapsed
    pub fn should_publish_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_publish {
            None => true,
            Some(last) => now - last >= self.interval(),
        }
    }

    fn minutes_until_due(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_publish.map(|last| {
            let remaining = self
                .interval()
                .checked_sub(&(now - last))
                .unwrap_or(ChronoDuration::MAX);
            (remaining.num_milliseconds() as f64 / 60_000.0).max(0.0)
        })
    }

    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, PublishError> {
        self.run_cycle_at(Utc::now()).await
    }

    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome, PublishError> {
        if !self.should_publish_at(now) {
            let minutes_remaining = self.minutes_until_due(now).unwrap_or(0.0);
            info!("Not time to publish yet. Next publish in {:.1} minutes", minutes_remaining);
            return Ok(CycleOutcome::NotDue { minutes_remaining });
        }

        info!("Starting publish cycle");
        let ingest = self.pipeline.refresh().await?;
        info!("Fetched {} items, stored {}", ingest.fetched, ingest.stored);

        let Some(item) = self.ledger.next_to_publish_within(now, self.fresh_window())? else {
            warn!("No items available to publish");
            return Ok(CycleOutcome::NothingToPublish { ingest });
        };

        if let Err(e) = self.delivery.deliver(&item).await {
            error!("Delivery via {} failed for {}: {}", self.delivery.name(), item.id, e);
            return Err(PublishError::DeliveryFailed {
                item_id: item.id,
                reason: e.to_string(),
            });
        }

        if !self.ledger.mark_published_at(&item.id, now)? {
            warn!(item = %item.id, "delivered item no longer in ledger");
        }
        self.last_publish = Some(now);
        info!(item = %item.id, score = item.score, "Published");

        Ok(CycleOutcome::Published {
            item_id: item.id,
            ingest,
        })
    }

    /// Run cycles until ctrl-c
    ///
    /// The pause after each cycle comes from [`backoff_for`]. A cycle that
    /// panics is logged and retried after `error_backoff_secs`.
    pub async fn run_continuous(&mut self) {
        info!(
            "Starting smart publisher (interval: {} minutes)",
            self.settings.interval_minutes
        );

        loop {
            let pause = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(result) => {
                    if let Err(e) = &result {
                        error!("Publish cycle failed: {}", e);
                    }
                    backoff_for(&self.settings, &result)
                }
                Err(panic) => {
                    error!("Unexpected error in continuous run: {}", panic_message(&*panic));
                    Duration::from_secs(self.settings.error_backoff_secs)
                }
            };

            info!("Waiting {:.1} minutes until next cycle", pause.as_secs_f64() / 60.0);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Smart publisher stopped");
                    return;
                }
            }
        }
    }

    pub fn status(&self) -> Result<PublisherStatus, PublishError> {
        let summary = self.ledger.summary()?;
        Ok(PublisherStatus {
            unpublished: summary.unpublished,
            published: summary.published,
            total: summary.total_items,
            interval_minutes: self.settings.interval_minutes,
            last_publish_time: self.last_publish,
            next_publish_in_minutes: self.minutes_until_due(Utc::now()),
        })
    }
}

/// Pause after a cycle: one interval on success, `retry_backoff_secs` on any error
pub fn backoff_for(
    settings: &PublisherSettings,
    result: &Result<CycleOutcome, PublishError>,
) -> Duration {
    match result {
        Ok(_) => Duration::from_secs(settings.interval_minutes.saturating_mul(60)),
        Err(_) => Duration::from_secs(settings.retry_backoff_secs),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use radar_agents::{DeliveryAdapter, SourceAdapter};
    use radar_core::{ContentItem, ScoringConfig};

    struct StaticSource(Vec<ContentItem>);

    #[async_trait]
    impl SourceAdapter for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self) -> Result<Vec<ContentItem>, AgentError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingDelivery {
        delivered: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl DeliveryAdapter for RecordingDelivery {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, item: &ContentItem) -> Result<(), AgentError> {
            if self.fail {
                return Err(AgentError::Delivery("channel down".to_string()));
            }
            self.delivered.lock().push(item.id.clone());
            Ok(())
        }
    }

    fn publisher(
        items: Vec<ContentItem>,
        delivery: Arc<RecordingDelivery>,
    ) -> (Arc<Ledger>, SmartPublisher) {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let config = Arc::new(parking_lot::RwLock::new(ScoringConfig::default()));
        let pipeline = IngestPipeline::new(ledger.clone(), config)
            .with_source(Arc::new(StaticSource(items)));
        let publisher = SmartPublisher::new(
            ledger.clone(),
            pipeline,
            delivery,
            PublisherSettings::default(),
        );
        (ledger, publisher)
    }

    fn feed_item(id: &str, text: &str, created_at: DateTime<Utc>) -> ContentItem {
        ContentItem::builder(id, &format!("https://example.com/{id}"), text)
            .followers(500)
            .created_at(created_at)
            .build()
    }

    #[test]
    fn test_interval_gate() {
        let (_, mut publisher) = publisher(vec![], Arc::new(RecordingDelivery::default()));
        let now = Utc::now();
        assert!(publisher.should_publish_at(now));

        publisher.last_publish = Some(now);
        assert!(!publisher.should_publish_at(now + ChronoDuration::minutes(29)));
        assert!(publisher.should_publish_at(now + ChronoDuration::minutes(30)));
    }

    #[tokio::test]
    async fn test_publishes_fresh_item_over_backlog() {
        let now = Utc::now();
        let delivery = Arc::new(RecordingDelivery::default());
        let (ledger, mut publisher) = publisher(
            vec![
                feed_item("fresh", "New humanoid demo", now - ChronoDuration::minutes(30)),
                feed_item("backlog", "Warehouse AMR roundup", now - ChronoDuration::days(2)),
            ],
            delivery.clone(),
        );
        ledger.insert(
            &ContentItem::builder("legacy", "https://example.com/legacy", "Old but strong")
                .created_at(now - ChronoDuration::days(2))
                .score(500.0)
                .build(),
        )
        .unwrap();

        let outcome = publisher.run_cycle_at(now).await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Published { ref item_id, .. } if item_id == "fresh"
        ));
        assert_eq!(*delivery.delivered.lock(), vec!["fresh".to_string()]);
        assert!(ledger.get("fresh").unwrap().unwrap().is_published());
        assert_eq!(publisher.last_publish_time(), Some(now));
    }

    #[tokio::test]
    async fn test_not_due_has_no_side_effects() {
        let now = Utc::now();
        let delivery = Arc::new(RecordingDelivery::default());
        let (ledger, mut publisher) =
            publisher(vec![feed_item("a", "One", now)], delivery.clone());
        publisher.last_publish = Some(now - ChronoDuration::minutes(10));

        let outcome = publisher.run_cycle_at(now).await.unwrap();
        match outcome {
            CycleOutcome::NotDue { minutes_remaining } => {
                assert!((minutes_remaining - 20.0).abs() < 1e-6)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(ledger.all().unwrap().is_empty());
        assert!(delivery.delivered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_leaves_item_unpublished() {
        let now = Utc::now();
        let delivery = Arc::new(RecordingDelivery {
            fail: true,
            ..Default::default()
        });
        let (ledger, mut publisher) = publisher(vec![feed_item("a", "One", now)], delivery);

        let err = publisher.run_cycle_at(now).await.unwrap_err();
        assert!(matches!(err, PublishError::DeliveryFailed { ref item_id, .. } if item_id == "a"));
        assert!(!ledger.get("a").unwrap().unwrap().is_published());
        assert!(publisher.last_publish_time().is_none());
        assert!(publisher.should_publish_at(now));
    }

    #[tokio::test]
    async fn test_nothing_to_publish() {
        let delivery = Arc::new(RecordingDelivery::default());
        let (_, mut publisher) = publisher(vec![], delivery);

        let outcome = publisher.run_cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::NothingToPublish { .. }));
        assert!(publisher.last_publish_time().is_none());
    }

    #[tokio::test]
    async fn test_drains_backlog_one_per_cycle() {
        let now = Utc::now();
        let delivery = Arc::new(RecordingDelivery::default());
        let (_, mut publisher) = publisher(
            vec![
                feed_item("a", "First headline", now - ChronoDuration::days(1)),
                feed_item("b", "Second unrelated story", now - ChronoDuration::days(2)),
            ],
            delivery.clone(),
        );

        publisher.run_cycle_at(now).await.unwrap();
        publisher
            .run_cycle_at(now + ChronoDuration::minutes(30))
            .await
            .unwrap();
        let outcome = publisher
            .run_cycle_at(now + ChronoDuration::minutes(60))
            .await
            .unwrap();

        assert_eq!(delivery.delivered.lock().len(), 2);
        assert!(matches!(outcome, CycleOutcome::NothingToPublish { .. }));
    }

    #[test]
    fn test_every_error_gets_retry_backoff() {
        let settings = PublisherSettings::default();
        let retry = Duration::from_secs(settings.retry_backoff_secs);

        let failures = [
            PublishError::DeliveryFailed {
                item_id: "a".to_string(),
                reason: "channel down".to_string(),
            },
            PublishError::Ingest(AgentError::Network("timeout".to_string())),
            PublishError::Ledger(LedgerError::NotFound("a".to_string())),
        ];
        for failure in failures {
            assert_eq!(backoff_for(&settings, &Err(failure)), retry);
        }
    }

    #[test]
    fn test_completed_cycles_wait_one_interval() {
        let settings = PublisherSettings::default();
        let interval = Duration::from_secs(30 * 60);

        let not_due = Ok(CycleOutcome::NotDue {
            minutes_remaining: 5.0,
        });
        let nothing = Ok(CycleOutcome::NothingToPublish {
            ingest: IngestReport::default(),
        });
        assert_eq!(backoff_for(&settings, &not_due), interval);
        assert_eq!(backoff_for(&settings, &nothing), interval);
    }

    #[test]
    fn test_huge_interval_saturates() {
        let settings = PublisherSettings {
            interval_minutes: u64::MAX,
            fresh_window_hours: i64::MAX,
            ..Default::default()
        };
        let ok = Ok(CycleOutcome::NothingToPublish {
            ingest: IngestReport::default(),
        });
        assert_eq!(backoff_for(&settings, &ok), Duration::from_secs(u64::MAX));

        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let config = Arc::new(parking_lot::RwLock::new(ScoringConfig::default()));
        let mut publisher = SmartPublisher::new(
            ledger.clone(),
            IngestPipeline::new(ledger, config),
            Arc::new(RecordingDelivery::default()),
            settings,
        );
        let now = Utc::now();
        assert_eq!(publisher.interval(), ChronoDuration::MAX);
        assert_eq!(publisher.fresh_window(), ChronoDuration::MAX);

        publisher.last_publish = Some(now);
        assert!(!publisher.should_publish_at(now + ChronoDuration::days(365)));
        assert!(publisher.minutes_until_due(now).unwrap() > 0.0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("cycle exploded");
        assert_eq!(panic_message(&*payload), "cycle exploded");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }

    #[tokio::test]
    async fn test_status() {
        let now = Utc::now();
        let delivery = Arc::new(RecordingDelivery::default());
        let (_, mut publisher) = publisher(
            vec![
                feed_item("a", "First headline", now),
                feed_item("b", "Second unrelated story", now),
            ],
            delivery,
        );

        let status = publisher.status().unwrap();
        assert_eq!(status.total, 0);
        assert!(status.next_publish_in_minutes.is_none());

        publisher.run_cycle().await.unwrap();
        let status = publisher.status().unwrap();
        assert_eq!(status.total, 2);
        assert_eq!(status.published, 1);
        assert_eq!(status.unpublished, 1);
        assert_eq!(status.interval_minutes, 30);
        assert!(status.next_publish_in_minutes.unwrap() > 29.0);
    }
}
