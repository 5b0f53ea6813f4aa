//! Batch maintenance over stored items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use radar_core::{score_at, ScoringConfig};
use radar_store::{Ledger, LedgerResult};

/// Score changes at or below this are not written back
pub const RESCORE_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RescoreReport {
    pub examined: usize,
    pub updated: usize,
}

pub fn rescore_all(ledger: &Ledger, config: &ScoringConfig) -> LedgerResult<RescoreReport> {
    rescore_all_at(ledger, config, Utc::now())
}

/// Recompute every score with current weights, feedback and recency
pub fn rescore_all_at(
    ledger: &Ledger,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> LedgerResult<RescoreReport> {
    let mut report = RescoreReport::default();

    for item in ledger.all()? {
        report.examined += 1;
        let tally = ledger.feedback_tally(&item.id)?;
        let feedback = (!tally.is_empty()).then_some(&tally);
        let new_score = score_at(&item, feedback, config, now);

        if (new_score - item.score).abs() > RESCORE_EPSILON {
            debug!(item = %item.id, old = item.score, new = new_score, "rescored");
            ledger.update_score(&item.id, new_score)?;
            report.updated += 1;
        }
    }

    info!(
        "Rescored {} items, {} updated",
        report.examined, report.updated
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use radar_core::{ContentItem, FeedbackType};

    #[test]
    fn test_rescore_only_writes_meaningful_changes() {
        let ledger = Ledger::open_in_memory().unwrap();
        let config = ScoringConfig::default();
        let now = Utc::now();

        let stale = ContentItem::builder("rss_1", "https://a", "Headline")
            .followers(500)
            .created_at(now - Duration::days(3))
            .score(500.0)
            .build();
        let mut current = ContentItem::builder("rss_2", "https://b", "Other")
            .followers(500)
            .created_at(now - Duration::days(3))
            .build();
        current.score = score_at(&current, None, &config, now) + 0.05;
        ledger.insert(&stale).unwrap();
        ledger.insert(&current).unwrap();

        let report = rescore_all_at(&ledger, &config, now).unwrap();
        assert_eq!(report, RescoreReport { examined: 2, updated: 1 });

        let expected = score_at(&stale, None, &config, now);
        assert!((ledger.get("rss_1").unwrap().unwrap().score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rescore_applies_feedback() {
        let ledger = Ledger::open_in_memory().unwrap();
        let config = ScoringConfig::default();
        let now = Utc::now();
        let item = ContentItem::builder("rss_1", "https://a", "Headline")
            .followers(500)
            .created_at(now)
            .build();
        let base = score_at(&item, None, &config, now);
        let mut stored = item.clone();
        stored.score = base;
        ledger.insert(&stored).unwrap();
        ledger.add_feedback("rss_1", "u1", FeedbackType::Dislike).unwrap();

        rescore_all_at(&ledger, &config, now).unwrap();
        assert_eq!(ledger.get("rss_1").unwrap().unwrap().score, 0.0);
    }
}
