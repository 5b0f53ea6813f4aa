//! Reviewer feedback vocabulary
//!
//! Feedback arrives as `(item_id, user_id, feedback_type)` triples. The type is
//! validated against a fixed vocabulary before anything is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Validation errors raised at the feedback boundary
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid feedback type: {0}")]
    InvalidFeedbackType(String),

    #[error("Invalid rating: {0} (expected 1-5)")]
    InvalidRating(String),
}

/// Kinds of feedback a reviewer can give
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Like,
    Dislike,
    #[serde(rename = "rating_1")]
    Rating1,
    #[serde(rename = "rating_2")]
    Rating2,
    #[serde(rename = "rating_3")]
    Rating3,
    #[serde(rename = "rating_4")]
    Rating4,
    #[serde(rename = "rating_5")]
    Rating5,
    Approved,
    Rejected,
    Edited,
    Skipped,
}

/// How a feedback type counts toward the aggregate trend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 11] = [
        FeedbackType::Like,
        FeedbackType::Dislike,
        FeedbackType::Rating1,
        FeedbackType::Rating2,
        FeedbackType::Rating3,
        FeedbackType::Rating4,
        FeedbackType::Rating5,
        FeedbackType::Approved,
        FeedbackType::Rejected,
        FeedbackType::Edited,
        FeedbackType::Skipped,
    ];

    /// Review statuses recorded by the moderation workflow
    pub const REVIEW_STATUSES: [FeedbackType; 4] = [
        FeedbackType::Approved,
        FeedbackType::Rejected,
        FeedbackType::Edited,
        FeedbackType::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Like => "like",
            FeedbackType::Dislike => "dislike",
            FeedbackType::Rating1 => "rating_1",
            FeedbackType::Rating2 => "rating_2",
            FeedbackType::Rating3 => "rating_3",
            FeedbackType::Rating4 => "rating_4",
            FeedbackType::Rating5 => "rating_5",
            FeedbackType::Approved => "approved",
            FeedbackType::Rejected => "rejected",
            FeedbackType::Edited => "edited",
            FeedbackType::Skipped => "skipped",
        }
    }

    /// Star rating for `rating_N` types
    pub fn rating(&self) -> Option<u8> {
        match self {
            FeedbackType::Rating1 => Some(1),
            FeedbackType::Rating2 => Some(2),
            FeedbackType::Rating3 => Some(3),
            FeedbackType::Rating4 => Some(4),
            FeedbackType::Rating5 => Some(5),
            _ => None,
        }
    }

    /// Build a rating type from a 1-5 star value
    pub fn from_rating(rating: u8) -> Result<Self, CoreError> {
        match rating {
            1 => Ok(FeedbackType::Rating1),
            2 => Ok(FeedbackType::Rating2),
            3 => Ok(FeedbackType::Rating3),
            4 => Ok(FeedbackType::Rating4),
            5 => Ok(FeedbackType::Rating5),
            other => Err(CoreError::InvalidRating(other.to_string())),
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            FeedbackType::Like
            | FeedbackType::Approved
            | FeedbackType::Rating4
            | FeedbackType::Rating5 => Polarity::Positive,
            FeedbackType::Dislike
            | FeedbackType::Rejected
            | FeedbackType::Rating1
            | FeedbackType::Rating2 => Polarity::Negative,
            _ => Polarity::Neutral,
        }
    }

    pub fn is_review_status(&self) -> bool {
        Self::REVIEW_STATUSES.contains(self)
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("rating_") {
            let rating: u8 = rest
                .parse()
                .map_err(|_| CoreError::InvalidRating(rest.to_string()))?;
            return Self::from_rating(rating);
        }

        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::InvalidFeedbackType(s.to_string()))
    }
}

/// One reviewer's feedback on one item (latest submission wins)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub item_id: String,
    pub user_id: String,
    pub feedback_type: FeedbackType,
    pub created_at: DateTime<Utc>,
}

/// Like/dislike counts used by the feedback adjustment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackTally {
    pub like: u64,
    pub dislike: u64,
}

impl FeedbackTally {
    pub fn new(like: u64, dislike: u64) -> Self {
        Self { like, dislike }
    }

    pub fn total(&self) -> u64 {
        self.like + self.dislike
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Share of likes, `None` when there is no feedback
    pub fn ratio(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.like as f64 / self.total() as f64)
        }
    }
}
