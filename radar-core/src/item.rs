//! Canonical content item
//!
//! Every source (feed, forum, code host, social post) is normalized into one
//! record shape before it reaches the deduplication gate, the scoring engine
//! and the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single piece of curated material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Globally unique id; the prefix encodes the origin (`rss_`, `hn_`, ...)
    pub id: String,

    /// Full text. Feed-like sources put the headline on the first line.
    pub text: String,

    /// Canonical URL of the underlying content
    pub url: String,

    #[serde(default)]
    pub author_id: String,

    #[serde(default)]
    pub author_username: String,

    #[serde(default)]
    pub author_name: String,

    /// Follower count of the author (0 if unknown)
    #[serde(default)]
    pub author_followers: u64,

    #[serde(default)]
    pub likes: u64,

    /// Shares / reposts / retweets
    #[serde(default)]
    pub shares: u64,

    #[serde(default)]
    pub replies: u64,

    /// Original publication time (not ingestion time)
    pub created_at: DateTime<Utc>,

    /// Descriptive tags
    #[serde(default)]
    pub topics: Vec<String>,

    /// Tags that drive category-weighted scoring
    #[serde(default)]
    pub categories: Vec<String>,

    /// Human-readable summary, opaque to the engine
    #[serde(default)]
    pub summary: Option<String>,

    /// Rank score, always non-negative
    #[serde(default)]
    pub score: f64,

    /// `None` means the item is still eligible for publication
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// Create a new item builder
    pub fn builder(id: &str, url: &str, text: &str) -> ContentItemBuilder {
        ContentItemBuilder::new(id, url, text)
    }

    /// First non-empty line of the text, used for fuzzy title matching
    pub fn title(&self) -> &str {
        title_of(&self.text)
    }

    /// No social engagement on either primary signal
    pub fn is_zero_engagement(&self) -> bool {
        self.likes == 0 && self.shares == 0
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Sum of all engagement counters
    pub fn total_engagement(&self) -> u64 {
        self.likes + self.shares + self.replies
    }

    /// Hours elapsed since publication, relative to `now`
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// First non-empty, trimmed line of a text
pub fn title_of(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

/// Builder for content items
pub struct ContentItemBuilder {
    item: ContentItem,
}

impl ContentItemBuilder {
    pub fn new(id: &str, url: &str, text: &str) -> Self {
        Self {
            item: ContentItem {
                id: id.to_string(),
                text: text.to_string(),
                url: url.to_string(),
                author_id: String::new(),
                author_username: String::new(),
                author_name: String::new(),
                author_followers: 0,
                likes: 0,
                shares: 0,
                replies: 0,
                created_at: Utc::now(),
                topics: Vec::new(),
                categories: Vec::new(),
                summary: None,
                score: 0.0,
                published_at: None,
            },
        }
    }

    pub fn author(mut self, id: &str, username: &str, name: &str) -> Self {
        self.item.author_id = id.to_string();
        self.item.author_username = username.to_string();
        self.item.author_name = name.to_string();
        self
    }

    pub fn followers(mut self, followers: u64) -> Self {
        self.item.author_followers = followers;
        self
    }

    pub fn engagement(mut self, likes: u64, shares: u64, replies: u64) -> Self {
        self.item.likes = likes;
        self.item.shares = shares;
        self.item.replies = replies;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.item.created_at = created_at;
        self
    }

    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.item.summary = Some(summary.to_string());
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.item.score = score.max(0.0);
        self
    }

    pub fn build(self) -> ContentItem {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_title_is_first_non_empty_line() {
        let item = ContentItem::builder(
            "rss_1",
            "https://example.com/a",
            "\n  Boston Dynamics ships Atlas  \n\nBody text here",
        )
        .build();

        assert_eq!(item.title(), "Boston Dynamics ships Atlas");
        assert_eq!(title_of(""), "");
    }

    #[test]
    fn test_zero_engagement() {
        let feed = ContentItem::builder("rss_1", "u", "t").engagement(0, 0, 4).build();
        let social = ContentItem::builder("tw_1", "u2", "t").engagement(3, 0, 0).build();

        assert!(feed.is_zero_engagement());
        assert!(!social.is_zero_engagement());
        assert_eq!(feed.total_engagement(), 4);
    }

    #[test]
    fn test_age_hours() {
        let now = Utc::now();
        let item = ContentItem::builder("rss_1", "u", "t")
            .created_at(now - Duration::minutes(90))
            .build();

        assert!((item.age_hours(now) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "id": "file_abc",
            "text": "Title\nBody",
            "url": "https://example.com/x",
            "created_at": "2024-05-01T12:00:00Z"
        }"#;

        let item: ContentItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.author_followers, 0);
        assert!(item.categories.is_empty());
        assert!(item.published_at.is_none());
        assert_eq!(item.score, 0.0);
    }
}
