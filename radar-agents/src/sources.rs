//! Reference source adapters

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use radar_core::ContentItem;

use crate::{AgentError, SourceAdapter};

/// One record in a JSON source file
///
/// Only `url` is required. The headline and body are joined so the headline
/// lands on the first line of the item text.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "content")]
    pub text: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_followers: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default, alias = "retweets")]
    pub shares: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl FileEntry {
    /// Normalize into a content item, stamping undated entries with `now`
    pub fn into_item(self, now: DateTime<Utc>) -> ContentItem {
        let id = self.id.unwrap_or_else(|| file_item_id(&self.url));
        let text = match (self.title, self.text) {
            (Some(title), Some(body)) => format!("{}\n{}", title.trim(), body.trim()),
            (Some(title), None) => title.trim().to_string(),
            (None, Some(body)) => body.trim().to_string(),
            (None, None) => String::new(),
        };
        let author = self.author.unwrap_or_default();

        let mut builder = ContentItem::builder(&id, &self.url, &text)
            .author(&author, &author, &author)
            .followers(self.author_followers)
            .engagement(self.likes, self.shares, self.replies)
            .created_at(self.created_at.unwrap_or(now))
            .topics(self.topics)
            .categories(self.categories);
        if let Some(summary) = &self.summary {
            builder = builder.summary(summary);
        }
        builder.build()
    }
}

/// Stable id for file-sourced items: `file_` + first 16 hex chars of SHA-256(url)
pub fn file_item_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("file_{}", &format!("{:x}", hasher.finalize())[..16])
}

/// Reads a JSON array of [`FileEntry`] records on every fetch
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: &str, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceAdapter for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<ContentItem>, AgentError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let entries: Vec<FileEntry> = serde_json::from_str(&raw)
            .map_err(|e| AgentError::Parse(format!("{}: {}", self.path.display(), e)))?;

        let now = Utc::now();
        let items: Vec<ContentItem> = entries
            .into_iter()
            .filter(|entry| {
                let keep = !entry.url.trim().is_empty();
                if !keep {
                    debug!(source = %self.name, "skipping entry without url");
                }
                keep
            })
            .map(|entry| entry.into_item(now))
            .collect();

        info!("Source {} produced {} items", self.name, items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_item_id_is_stable() {
        let a = file_item_id("https://example.com/a");
        assert_eq!(a, file_item_id("https://example.com/a"));
        assert_ne!(a, file_item_id("https://example.com/b"));
        assert!(a.starts_with("file_"));
        assert_eq!(a.len(), "file_".len() + 16);
    }

    #[test]
    fn test_entry_puts_title_on_first_line() {
        let entry: FileEntry = serde_json::from_str(
            r#"{"url": "https://x", "title": " Atlas ", "content": "Body", "retweets": 4}"#,
        )
        .unwrap();
        let now = Utc::now();
        let item = entry.into_item(now);

        assert_eq!(item.title(), "Atlas");
        assert_eq!(item.text, "Atlas\nBody");
        assert_eq!(item.shares, 4);
        assert_eq!(item.created_at, now);
        assert_eq!(item.id, file_item_id("https://x"));
    }

    #[tokio::test]
    async fn test_fetch_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"url": "https://a", "title": "One", "categories": ["navigation"]}},
                {{"url": "  ", "title": "No url"}},
                {{"id": "custom", "url": "https://b", "text": "Two", "created_at": "2024-05-01T00:00:00Z"}}
            ]"#
        )
        .unwrap();

        let source = JsonFileSource::new("file", file.path());
        let items = source.fetch().await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].categories, vec!["navigation"]);
        assert_eq!(items[1].id, "custom");
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let source = JsonFileSource::new("file", file.path());
        assert!(matches!(source.fetch().await, Err(AgentError::Parse(_))));
    }
}
