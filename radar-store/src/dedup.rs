//! Deduplication gate
//!
//! Decides whether a candidate is already represented in the ledger. Checks
//! short-circuit in order: exact URL, fuzzy title against recent items, then
//! (only when a preview is supplied) fuzzy content against recent items.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use radar_core::{title_of, SimilarityMatcher};

use crate::{Ledger, LedgerResult};

/// Similarity thresholds and how far back each fuzzy check looks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub title_threshold: f64,
    pub title_window: usize,
    pub content_threshold: f64,
    pub content_window: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_threshold: 0.8,
            title_window: 1000,
            content_threshold: 0.7,
            content_window: 500,
        }
    }
}

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateReason {
    Url,
    Title { similarity: f64 },
    Content { similarity: f64 },
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateReason::Url => write!(f, "url already stored"),
            DuplicateReason::Title { similarity } => {
                write!(f, "similar title ({similarity:.2})")
            }
            DuplicateReason::Content { similarity } => {
                write!(f, "similar content ({similarity:.2})")
            }
        }
    }
}

/// Read-only duplicate check against a ledger
pub struct DedupGate<'a> {
    ledger: &'a Ledger,
    config: DedupConfig,
}

impl<'a> DedupGate<'a> {
    pub fn new(ledger: &'a Ledger, config: DedupConfig) -> Self {
        Self { ledger, config }
    }

    pub fn is_duplicate(
        &self,
        title: &str,
        url: &str,
        content_preview: Option<&str>,
    ) -> LedgerResult<bool> {
        Ok(self.check(title, url, content_preview)?.is_some())
    }

    /// First matching duplicate rule, if any
    pub fn check(
        &self,
        title: &str,
        url: &str,
        content_preview: Option<&str>,
    ) -> LedgerResult<Option<DuplicateReason>> {
        if self.ledger.url_exists(url)? {
            debug!(url, "duplicate url");
            return Ok(Some(DuplicateReason::Url));
        }

        let window = self.config.title_window.max(self.config.content_window);
        let texts = self.ledger.recent_texts(window)?;

        let matcher = SimilarityMatcher::new(title, self.config.title_threshold);
        for text in texts.iter().take(self.config.title_window) {
            let existing = title_of(text);
            if matcher.matches(existing) {
                let similarity = matcher.ratio(existing);
                debug!(title, existing, similarity, "duplicate title");
                return Ok(Some(DuplicateReason::Title { similarity }));
            }
        }

        if let Some(preview) = content_preview {
            let matcher = SimilarityMatcher::new(preview, self.config.content_threshold);
            for text in texts.iter().take(self.config.content_window) {
                if matcher.matches(text) {
                    let similarity = matcher.ratio(text);
                    debug!(similarity, "duplicate content");
                    return Ok(Some(DuplicateReason::Content { similarity }));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use radar_core::ContentItem;

    fn ledger_with(items: &[(&str, &str, &str)]) -> Ledger {
        let ledger = Ledger::open_in_memory().unwrap();
        for (id, url, text) in items {
            ledger.insert(&ContentItem::builder(id, url, text).build()).unwrap();
        }
        ledger
    }

    #[test]
    fn test_exact_url() {
        let ledger = ledger_with(&[("a", "https://x/1", "Atlas goes electric\nBody")]);
        let gate = DedupGate::new(&ledger, DedupConfig::default());

        assert_eq!(
            gate.check("Completely different", "https://x/1", None).unwrap(),
            Some(DuplicateReason::Url)
        );
    }

    #[test]
    fn test_fuzzy_title_is_case_insensitive() {
        let ledger = ledger_with(&[(
            "a",
            "https://x/1",
            "Boston Dynamics unveils new electric Atlas\nBody",
        )]);
        let gate = DedupGate::new(&ledger, DedupConfig::default());

        let reason = gate
            .check("BOSTON DYNAMICS UNVEILS NEW ELECTRIC ATLAS ROBOT", "https://y/2", None)
            .unwrap();
        assert!(matches!(reason, Some(DuplicateReason::Title { similarity }) if similarity >= 0.8));

        assert!(!gate.is_duplicate("ROS 2 Jazzy release notes", "https://y/3", None).unwrap());
    }

    #[test]
    fn test_content_only_checked_with_preview() {
        let body = "Researchers demonstrate a quadruped that learns to climb stairs in simulation";
        let ledger = ledger_with(&[("a", "https://x/1", body)]);
        let gate = DedupGate::new(&ledger, DedupConfig::default());

        assert!(!gate.is_duplicate("Unrelated headline", "https://y/2", None).unwrap());
        let reason = gate
            .check(
                "Unrelated headline",
                "https://y/2",
                Some("Researchers demonstrate a quadruped that learns to climb stairs in sim"),
            )
            .unwrap();
        assert!(matches!(reason, Some(DuplicateReason::Content { .. })));
    }

    #[test]
    fn test_title_window_limits_lookback() {
        let ledger = Ledger::open_in_memory().unwrap();
        let now = Utc::now();
        ledger
            .insert(
                &ContentItem::builder("old", "https://x/old", "Tesla Optimus folds laundry")
                    .created_at(now - Duration::days(30))
                    .build(),
            )
            .unwrap();
        ledger
            .insert(
                &ContentItem::builder("new", "https://x/new", "Unitree G1 price drop")
                    .created_at(now)
                    .build(),
            )
            .unwrap();

        let config = DedupConfig {
            title_window: 1,
            ..Default::default()
        };
        let gate = DedupGate::new(&ledger, config);
        assert!(!gate.is_duplicate("Tesla Optimus folds laundry", "https://y", None).unwrap());

        let gate = DedupGate::new(&ledger, DedupConfig::default());
        assert!(gate.is_duplicate("Tesla Optimus folds laundry", "https://y", None).unwrap());
    }

    #[test]
    fn test_empty_ledger_has_no_duplicates() {
        let ledger = Ledger::open_in_memory().unwrap();
        let gate = DedupGate::new(&ledger, DedupConfig::default());
        assert!(!gate.is_duplicate("", "https://z", Some("")).unwrap());
    }

    fn article(seed: u64, words: usize) -> String {
        const VOCAB: &[&str] = &[
            "robot", "actuator", "gripper", "lidar", "humanoid", "warehouse", "torque",
            "controller", "policy", "simulation", "dataset", "locomotion", "sensor",
            "battery", "deployment", "navigation", "manipulator", "benchmark",
        ];
        let mut state = seed;
        let mut text = String::new();
        for _ in 0..words {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            text.push_str(VOCAB[(state >> 33) as usize % VOCAB.len()]);
            text.push(' ');
        }
        text
    }

    #[test]
    fn test_content_check_over_long_texts_is_fast() {
        let ledger = Ledger::open_in_memory().unwrap();
        for i in 0..200 {
            let text = format!("Field report {i}\n{}", article(i, 400));
            let (id, url) = (format!("r{i}"), format!("https://x/{i}"));
            ledger.insert(&ContentItem::builder(&id, &url, &text).build()).unwrap();
        }
        let gate = DedupGate::new(&ledger, DedupConfig::default());
        let preview = article(9_999, 400);
        assert!(preview.len() > 3_000);

        let started = std::time::Instant::now();
        let reason = gate
            .check("Quarterly humanoid shipments", "https://y/new", Some(&preview))
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(reason, None);
        assert!(elapsed < std::time::Duration::from_secs(5), "took {elapsed:?}");
    }
}
