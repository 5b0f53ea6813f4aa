//! Feedback processing
//!
//! Each submission is validated, stored (latest per user wins), folded into the
//! item's score and, for star ratings, into the category preferences, which
//! are saved to the ledger.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use radar_core::{score, FeedbackType, PreferenceUpdate, FALLBACK_CATEGORY};
use radar_store::{Ledger, LedgerError};

use crate::{AgentError, SharedConfig};

/// What one submission changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub item_id: String,
    pub feedback_type: FeedbackType,
    pub previous_score: f64,
    pub score: f64,
    pub preference_updates: Vec<PreferenceUpdate>,
    /// New `user_feedback` weight when the aggregate trend moved it
    pub feedback_weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Like/dislike view of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub total_feedback: u64,
    pub likes: u64,
    pub dislikes: u64,
    pub positive_ratio: f64,
    pub sentiment: Sentiment,
}

pub struct FeedbackProcessor {
    ledger: Arc<Ledger>,
    config: SharedConfig,
}

impl FeedbackProcessor {
    pub fn new(ledger: Arc<Ledger>, config: SharedConfig) -> Self {
        Self { ledger, config }
    }

    /// Parse the type string first; nothing is stored when it is invalid
    pub fn submit(
        &self,
        item_id: &str,
        user_id: &str,
        feedback_type: &str,
    ) -> Result<FeedbackOutcome, AgentError> {
        let feedback_type: FeedbackType = feedback_type.parse()?;
        self.process(item_id, user_id, feedback_type)
    }

    pub fn process(
        &self,
        item_id: &str,
        user_id: &str,
        feedback_type: FeedbackType,
    ) -> Result<FeedbackOutcome, AgentError> {
        let item = self
            .ledger
            .get(item_id)?
            .ok_or_else(|| LedgerError::NotFound(item_id.to_string()))?;

        self.ledger.add_feedback(item_id, user_id, feedback_type)?;

        let mut preference_updates = Vec::new();
        let feedback_weight = {
            let mut config = self.config.write();

            if let Some(rating) = feedback_type.rating() {
                let fallback = [FALLBACK_CATEGORY.to_string()];
                let categories = if item.categories.is_empty() {
                    &fallback[..]
                } else {
                    &item.categories[..]
                };
                for category in categories {
                    if let Some(update) = config.update_preference(category, rating)? {
                        preference_updates.push(update);
                    }
                }
            }

            match self.ledger.feedback_stats()?.positive_ratio {
                Some(ratio) => config.adjust_feedback_weight(ratio),
                None => None,
            }
        };

        for update in &preference_updates {
            self.ledger
                .save_preference(&update.category, update.preference, update.weight)?;
        }

        let tally = self.ledger.feedback_tally(item_id)?;
        let new_score = {
            let config = self.config.read();
            score(&item, Some(&tally), &config)
        };
        self.ledger.update_score(item_id, new_score)?;

        info!(
            "Feedback processed: {} for item {} by user {} (score {:.2} -> {:.2})",
            feedback_type, item_id, user_id, item.score, new_score
        );

        Ok(FeedbackOutcome {
            item_id: item_id.to_string(),
            feedback_type,
            previous_score: item.score,
            score: new_score,
            preference_updates,
            feedback_weight,
        })
    }

    pub fn summary(&self, item_id: &str) -> Result<FeedbackSummary, AgentError> {
        let tally = self.ledger.feedback_tally(item_id)?;
        let positive_ratio = tally.ratio().unwrap_or(0.0);
        let sentiment = match tally.ratio() {
            Some(r) if r > 0.6 => Sentiment::Positive,
            Some(r) if r < 0.4 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        };

        Ok(FeedbackSummary {
            total_feedback: tally.total(),
            likes: tally.like,
            dislikes: tally.dislike,
            positive_ratio,
            sentiment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use radar_core::{ContentItem, CoreError, ScoringConfig};

    fn setup(categories: &[&str]) -> (Arc<Ledger>, SharedConfig, FeedbackProcessor) {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let item = ContentItem::builder("rss_1", "https://a", "Headline")
            .followers(500)
            .categories(categories.iter().copied())
            .score(100.0)
            .build();
        ledger.insert(&item).unwrap();

        let config = Arc::new(RwLock::new(ScoringConfig::default()));
        let processor = FeedbackProcessor::new(ledger.clone(), config.clone());
        (ledger, config, processor)
    }

    #[test]
    fn test_invalid_type_is_rejected_before_storage() {
        let (ledger, _, processor) = setup(&[]);
        let err = processor.submit("rss_1", "u1", "love").unwrap_err();
        assert!(matches!(err, AgentError::Invalid(CoreError::InvalidFeedbackType(_))));
        assert!(ledger.feedback_for("rss_1").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_item() {
        let (_, _, processor) = setup(&[]);
        let err = processor.submit("ghost", "u1", "like").unwrap_err();
        assert!(matches!(err, AgentError::Ledger(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_likes_and_dislikes_rescore_item() {
        let (ledger, _, processor) = setup(&[]);

        let outcome = processor.submit("rss_1", "u1", "like").unwrap();
        assert!(outcome.score > outcome.previous_score);

        processor.submit("rss_1", "u2", "dislike").unwrap();
        processor.submit("rss_1", "u3", "dislike").unwrap();
        let stored = ledger.get("rss_1").unwrap().unwrap();
        // 1 like / 3 → multiplier 2/3
        let summary = processor.summary("rss_1").unwrap();
        assert_eq!(summary.sentiment, Sentiment::Negative);
        assert!(stored.score < outcome.score);
    }

    #[test]
    fn test_rating_updates_category_preferences() {
        let (_, config, processor) = setup(&["navigation", "research"]);
        let outcome = processor.submit("rss_1", "u1", "rating_1").unwrap();

        assert_eq!(outcome.preference_updates.len(), 2);
        let config = config.read();
        assert!((config.user_preferences["navigation"] - 0.9).abs() < 1e-12);
        assert!((config.category_weight("research") - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_rating_without_categories_learns_fallback() {
        let (_, config, processor) = setup(&[]);
        processor.submit("rss_1", "u1", "rating_5").unwrap();
        assert!(config.read().user_preferences.contains_key(FALLBACK_CATEGORY));
    }

    #[test]
    fn test_rating_moves_score_of_ingested_uncategorized_item() {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let config: SharedConfig = Arc::new(RwLock::new(ScoringConfig::default()));
        let pipeline = crate::IngestPipeline::new(ledger.clone(), config.clone());
        let item = ContentItem::builder("rss_9", "https://n", "Weekly links\nRoundup")
            .followers(500)
            .build();
        assert!(pipeline.ingest_item(item).unwrap());

        let stored = ledger.get("rss_9").unwrap().unwrap();
        assert_eq!(stored.categories, vec![FALLBACK_CATEGORY.to_string()]);

        let processor = FeedbackProcessor::new(ledger.clone(), config);
        let mut previous = stored.score;
        for user in 0..5 {
            let outcome = processor
                .submit("rss_9", &format!("u{user}"), "rating_1")
                .unwrap();
            assert!(outcome.score < previous);
            previous = outcome.score;
        }
        assert_eq!(ledger.get("rss_9").unwrap().unwrap().score, previous);
    }

    #[test]
    fn test_ratings_are_saved_for_the_next_run() {
        let (ledger, _, processor) = setup(&["navigation"]);
        processor.submit("rss_1", "u1", "rating_1").unwrap();

        let mut fresh = ScoringConfig::default();
        assert_eq!(ledger.load_preferences_into(&mut fresh).unwrap(), 1);
        assert!((fresh.category_weight("navigation") - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_positive_trend_raises_feedback_weight() {
        let (_, config, processor) = setup(&[]);
        let before = config.read().weights.user_feedback;

        let outcome = processor.submit("rss_1", "u1", "approved").unwrap();
        assert_eq!(outcome.feedback_weight, Some(before * 1.1));
        assert!(outcome.preference_updates.is_empty());
    }

    #[test]
    fn test_summary_without_feedback() {
        let (_, _, processor) = setup(&[]);
        let summary = processor.summary("rss_1").unwrap();
        assert_eq!(summary.total_feedback, 0);
        assert_eq!(summary.positive_ratio, 0.0);
        assert_eq!(summary.sentiment, Sentiment::Neutral);
    }
}
