//! Scoring configuration
//!
//! Weights, thresholds and learned category state are carried in one explicit
//! value that is passed into the scoring engine. Every field has a default so a
//! partial (or absent) settings file still produces a usable configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::DEFAULT_LEARNING_RATE;

/// Per-signal multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub likes: f64,
    pub retweets: f64,
    pub replies: f64,
    pub user_feedback: f64,
    pub author_followers: f64,
    pub content_length: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            likes: 1.0,
            retweets: 2.0,
            replies: 1.5,
            user_feedback: 3.0,
            author_followers: 0.1,
            content_length: 0.5,
        }
    }
}

/// Minimum-engagement floors for the eligibility gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_likes: u64,
    pub min_retweets: u64,
    pub min_author_followers: u64,
    /// Follower floor for items without likes or shares
    pub zero_engagement_min_followers: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_likes: 10,
            min_retweets: 5,
            min_author_followers: 1000,
            zero_engagement_min_followers: 100,
        }
    }
}

/// Everything the scoring engine and preference store need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    #[serde(rename = "scoring_weights")]
    pub weights: ScoringWeights,

    pub thresholds: Thresholds,

    /// Effective per-category multipliers (clamped)
    pub category_weights: HashMap<String, f64>,

    /// Unclamped learned preferences, shadowing `category_weights`
    pub user_preferences: HashMap<String, f64>,

    pub learning_rate: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            thresholds: Thresholds::default(),
            category_weights: HashMap::new(),
            user_preferences: HashMap::new(),
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

impl ScoringConfig {
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_category_weight(mut self, category: &str, weight: f64) -> Self {
        self.category_weights.insert(category.to_string(), weight);
        self
    }

    /// Effective weight for a category (1.0 when unconfigured)
    pub fn category_weight(&self, category: &str) -> f64 {
        self.category_weights.get(category).copied().unwrap_or(1.0)
    }
}
