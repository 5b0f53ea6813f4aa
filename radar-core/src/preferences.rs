//! Category preference learning
//!
//! Star ratings nudge a category's preference toward the normalized rating with
//! an exponential moving update. The effective category weight is the
//! preference clamped to [`MIN_CATEGORY_WEIGHT`], so a disliked category is
//! suppressed but never eliminated.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{CoreError, ScoringConfig, MIN_CATEGORY_WEIGHT};

/// Positive-feedback ratio above which the feedback weight grows
pub const TREND_HIGH: f64 = 0.7;

/// Positive-feedback ratio below which the feedback weight shrinks
pub const TREND_LOW: f64 = 0.3;

/// Outcome of one preference update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    pub category: String,
    pub previous: f64,
    pub preference: f64,
    pub weight: f64,
}

/// Map a 1-5 star rating onto `[0, 1]`
pub fn normalize_rating(rating: u8) -> Result<f64, CoreError> {
    if !(1..=5).contains(&rating) {
        return Err(CoreError::InvalidRating(rating.to_string()));
    }
    Ok((rating as f64 - 1.0) / 4.0)
}

impl ScoringConfig {
    /// Learn from a star rating given to an item in `category`
    ///
    /// Returns `Ok(None)` when the update produced a non-finite value and was
    /// skipped; the configuration is left untouched in that case.
    pub fn update_preference(
        &mut self,
        category: &str,
        rating: u8,
    ) -> Result<Option<PreferenceUpdate>, CoreError> {
        let normalized = normalize_rating(rating)?;
        let previous = self.user_preferences.get(category).copied().unwrap_or(1.0);
        let preference = previous + self.learning_rate * (normalized - previous);

        if !preference.is_finite() {
            warn!(category, rating, "non-finite preference update skipped");
            return Ok(None);
        }

        let weight = preference.max(MIN_CATEGORY_WEIGHT);
        self.user_preferences.insert(category.to_string(), preference);
        self.category_weights.insert(category.to_string(), weight);

        info!(
            category,
            "preference {:.3} -> {:.3} (weight {:.3})", previous, preference, weight
        );

        Ok(Some(PreferenceUpdate {
            category: category.to_string(),
            previous,
            preference,
            weight,
        }))
    }

    /// Reinstate a preference learned in an earlier run
    ///
    /// The effective weight is re-derived from the preference, so the floor
    /// holds whatever was stored. Non-finite values are ignored.
    pub fn restore_preference(&mut self, category: &str, preference: f64) -> bool {
        if !preference.is_finite() {
            warn!(category, "non-finite stored preference ignored");
            return false;
        }
        self.user_preferences.insert(category.to_string(), preference);
        self.category_weights
            .insert(category.to_string(), preference.max(MIN_CATEGORY_WEIGHT));
        true
    }

    /// Drift the `user_feedback` weight with the aggregate feedback trend
    ///
    /// Returns the new weight when it changed.
    pub fn adjust_feedback_weight(&mut self, positive_ratio: f64) -> Option<f64> {
        let factor = if positive_ratio > TREND_HIGH {
            1.1
        } else if positive_ratio < TREND_LOW {
            0.9
        } else {
            return None;
        };

        let adjusted = self.weights.user_feedback * factor;
        if !adjusted.is_finite() {
            warn!(positive_ratio, "non-finite feedback weight adjustment skipped");
            return None;
        }

        info!(
            "user_feedback weight {:.3} -> {:.3}",
            self.weights.user_feedback, adjusted
        );
        self.weights.user_feedback = adjusted;
        Some(adjusted)
    }
}
