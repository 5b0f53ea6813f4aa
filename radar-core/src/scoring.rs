//! Scoring engine
//!
//! Maps a content item, an optional feedback tally and a scoring configuration
//! to a non-negative rank score:
//! 1. Eligibility gate (hard zero on failure)
//! 2. Base score (zero-engagement or engagement path, plus author, content and recency terms)
//! 3. Feedback multiplier in `[0, 2]`
//! 4. Mean category weight
//! 5. Floor at zero
//!
//! Scoring never fails: a non-finite intermediate value degrades the score to
//! `0.0` so one malformed item cannot halt a batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    ContentItem, FeedbackTally, ScoringConfig, ScoringWeights, Thresholds,
    CONTENT_REFERENCE_CHARS, ZERO_ENGAGEMENT_BASE,
};

/// Score an item against the current wall clock
pub fn score(item: &ContentItem, feedback: Option<&FeedbackTally>, config: &ScoringConfig) -> f64 {
    score_at(item, feedback, config, Utc::now())
}

/// Score an item as of `now`
pub fn score_at(
    item: &ContentItem,
    feedback: Option<&FeedbackTally>,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> f64 {
    if !meets_thresholds(item, &config.thresholds) {
        debug!(item = %item.id, "below thresholds, score 0");
        return 0.0;
    }

    let base = base_score(item, &config.weights, now);
    let adjusted = match feedback {
        Some(tally) => apply_feedback(base, tally),
        None => base,
    };
    let final_score = adjusted * category_multiplier(item, config);

    if !final_score.is_finite() {
        warn!(item = %item.id, "non-finite score, degrading to 0");
        return 0.0;
    }

    let final_score = final_score.max(0.0);
    debug!(item = %item.id, base, final_score, "scored");
    final_score
}

/// Eligibility gate
///
/// Items with neither likes nor shares only need a modest follower count;
/// socially-validated items must clear all three floors at once.
pub fn meets_thresholds(item: &ContentItem, thresholds: &Thresholds) -> bool {
    if item.is_zero_engagement() {
        item.author_followers >= thresholds.zero_engagement_min_followers
    } else {
        item.likes >= thresholds.min_likes
            && item.shares >= thresholds.min_retweets
            && item.author_followers >= thresholds.min_author_followers
    }
}

/// Base score before feedback and category adjustments
pub fn base_score(item: &ContentItem, weights: &ScoringWeights, now: DateTime<Utc>) -> f64 {
    let author = author_term(item.author_followers, weights);
    let content = content_term(&item.text, weights);
    let recency = recency_bonus(item.age_hours(now));

    if item.is_zero_engagement() {
        ZERO_ENGAGEMENT_BASE + author + content + recency
    } else {
        engagement_term(item, weights) + author + content + recency
    }
}

fn engagement_term(item: &ContentItem, weights: &ScoringWeights) -> f64 {
    item.likes as f64 * weights.likes
        + item.shares as f64 * weights.retweets
        + item.replies as f64 * weights.replies
}

/// Logarithmically damped author influence
pub fn author_term(followers: u64, weights: &ScoringWeights) -> f64 {
    (followers.max(1) as f64).log10() * weights.author_followers
}

/// Length reward, flat beyond the reference length
pub fn content_term(text: &str, weights: &ScoringWeights) -> f64 {
    let chars = text.chars().count() as f64;
    (chars / CONTENT_REFERENCE_CHARS).min(1.0) * weights.content_length
}

/// Step-decaying bonus by age in hours. Future timestamps count as brand new.
pub fn recency_bonus(age_hours: f64) -> f64 {
    if age_hours <= 1.0 {
        50.0
    } else if age_hours <= 6.0 {
        30.0
    } else if age_hours <= 24.0 {
        15.0
    } else if age_hours <= 168.0 {
        5.0
    } else {
        0.0
    }
}

/// Multiplier in `[0, 2]` derived from the like ratio; 1.0 without feedback
pub fn feedback_multiplier(tally: &FeedbackTally) -> f64 {
    match tally.ratio() {
        Some(ratio) => 1.0 + (ratio - 0.5) * 2.0,
        None => 1.0,
    }
}

pub fn apply_feedback(base: f64, tally: &FeedbackTally) -> f64 {
    base * feedback_multiplier(tally)
}

/// Mean configured weight over the item's categories
pub fn category_multiplier(item: &ContentItem, config: &ScoringConfig) -> f64 {
    if config.category_weights.is_empty() || item.categories.is_empty() {
        return 1.0;
    }

    let sum: f64 = item
        .categories
        .iter()
        .map(|c| config.category_weight(c))
        .sum();
    let mean = sum / item.categories.len() as f64;

    if mean.is_finite() {
        mean
    } else {
        warn!(item = %item.id, "non-finite category weight, using 1.0");
        1.0
    }
}

/// Component-by-component view of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub meets_thresholds: bool,
    pub zero_engagement: bool,
    pub likes_score: f64,
    pub retweets_score: f64,
    pub replies_score: f64,
    pub engagement_score: f64,
    pub author_score: f64,
    pub content_score: f64,
    pub recency_bonus: f64,
    pub base_score: f64,
    pub feedback_multiplier: f64,
    pub category_multiplier: f64,
    pub final_score: f64,
}

/// Explain how an item's score is composed as of `now`
pub fn breakdown_at(
    item: &ContentItem,
    feedback: Option<&FeedbackTally>,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let w = &config.weights;
    let likes_score = item.likes as f64 * w.likes;
    let retweets_score = item.shares as f64 * w.retweets;
    let replies_score = item.replies as f64 * w.replies;

    ScoreBreakdown {
        meets_thresholds: meets_thresholds(item, &config.thresholds),
        zero_engagement: item.is_zero_engagement(),
        likes_score,
        retweets_score,
        replies_score,
        engagement_score: likes_score + retweets_score + replies_score,
        author_score: author_term(item.author_followers, w),
        content_score: content_term(&item.text, w),
        recency_bonus: recency_bonus(item.age_hours(now)),
        base_score: base_score(item, w, now),
        feedback_multiplier: feedback.map(feedback_multiplier).unwrap_or(1.0),
        category_multiplier: category_multiplier(item, config),
        final_score: score_at(item, feedback, config, now),
    }
}
