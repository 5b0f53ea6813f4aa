//! Settings file
//!
//! Loaded once at startup from TOML. Every section is optional:
//!
//! ```toml
//! learning_rate = 0.1
//!
//! [scoring_weights]
//! likes = 1.0
//! retweets = 2.0
//!
//! [thresholds]
//! zero_engagement_min_followers = 100
//!
//! [category_weights]
//! humanoid_robotics = 1.2
//!
//! [publisher]
//! interval_minutes = 30
//!
//! [storage]
//! path = "data/radar.db"
//!
//! [[sources]]
//! kind = "json_file"
//! name = "curated"
//! path = "data/curated.json"
//!
//! [delivery]
//! kind = "webhook"
//! url = "https://hooks.example.com/radar"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use radar_core::ScoringConfig;
use radar_store::{DedupConfig, StorageConfig};

use crate::{AgentError, JsonFileSource, LogDelivery, SharedDelivery, SharedSource, WebhookDelivery};

/// Publication cadence and backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    pub interval_minutes: u64,
    pub fresh_window_hours: i64,
    /// Sleep after a cycle that returned any error
    pub retry_backoff_secs: u64,
    /// Sleep after a cycle that panicked
    pub error_backoff_secs: u64,
    /// Sources fetched at once during a refresh
    pub max_concurrent_sources: usize,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            fresh_window_hours: radar_store::FRESH_WINDOW_HOURS,
            retry_backoff_secs: 300,
            error_backoff_secs: 60,
            max_concurrent_sources: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    JsonFile {
        name: String,
        path: PathBuf,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliverySettings {
    #[default]
    Log,
    Webhook {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub scoring: ScoringConfig,
    pub publisher: PublisherSettings,
    pub storage: StorageConfig,
    pub dedup: DedupConfig,
    pub sources: Vec<SourceSettings>,
    pub delivery: DeliverySettings,
}

impl Settings {
    pub fn from_toml(raw: &str) -> Result<Self, AgentError> {
        toml::from_str(raw).map_err(|e| AgentError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path)?;
        let settings = Self::from_toml(&raw)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load `path` if present, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, AgentError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn build_sources(&self) -> Vec<SharedSource> {
        self.sources
            .iter()
            .filter_map(|source| match source {
                SourceSettings::JsonFile {
                    name,
                    path,
                    enabled: true,
                } => Some(Arc::new(JsonFileSource::new(name, path)) as SharedSource),
                SourceSettings::JsonFile { .. } => None,
            })
            .collect()
    }

    pub fn build_delivery(&self) -> Result<SharedDelivery, AgentError> {
        let delivery: SharedDelivery = match &self.delivery {
            DeliverySettings::Log => Arc::new(LogDelivery),
            DeliverySettings::Webhook { url, timeout_secs } => Arc::new(WebhookDelivery::new(
                url,
                Duration::from_secs(*timeout_secs),
            )?),
        };
        Ok(delivery)
    }
}
