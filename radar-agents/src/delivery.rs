//! Reference delivery adapters

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use radar_core::ContentItem;

use crate::{AgentError, DeliveryAdapter};

/// Human-readable announcement for an item
pub fn render_message(item: &ContentItem) -> String {
    let mut message = format!("🤖 {}\n", item.title());
    if let Some(summary) = item.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        message.push_str(&format!("📝 {}\n", summary.trim()));
    }
    message.push_str(&format!(
        "Score: {:.2} | ❤️ {} | 🔄 {}\n{}",
        item.score, item.likes, item.shares, item.url
    ));
    message
}

/// Writes the announcement to the log; never fails
#[derive(Debug, Default)]
pub struct LogDelivery;

#[async_trait]
impl DeliveryAdapter for LogDelivery {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, item: &ContentItem) -> Result<(), AgentError> {
        info!(item = %item.id, "Publishing:\n{}", render_message(item));
        Ok(())
    }
}

/// POSTs `{"text": ..., "item": ...}` to a webhook
pub struct WebhookDelivery {
    client: Client,
    url: String,
}

impl WebhookDelivery {
    /// Fails when the URL does not parse or the HTTP client cannot be built
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AgentError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| AgentError::Config(format!("invalid webhook url {url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("webhook client: {e}")))?;

        Ok(Self {
            client,
            url: parsed.to_string(),
        })
    }
}

#[async_trait]
impl DeliveryAdapter for WebhookDelivery {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, item: &ContentItem) -> Result<(), AgentError> {
        let body = serde_json::json!({
            "text": render_message(item),
            "item": item,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Delivery(format!("webhook returned {}: {}", status, text)));
        }

        debug!(item = %item.id, url = %self.url, "webhook accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_message() {
        let item = ContentItem::builder("rss_1", "https://x/1", "Atlas goes electric\nBody")
            .summary("Boston Dynamics retires hydraulic Atlas")
            .engagement(12, 3, 0)
            .score(42.5)
            .build();

        let message = render_message(&item);
        assert!(message.starts_with("🤖 Atlas goes electric\n"));
        assert!(message.contains("Boston Dynamics retires hydraulic Atlas"));
        assert!(message.contains("Score: 42.50"));
        assert!(message.ends_with("https://x/1"));
    }

    #[test]
    fn test_render_message_without_summary() {
        let item = ContentItem::builder("rss_1", "https://x/1", "Title").build();
        assert!(!render_message(&item).contains("📝"));
    }

    #[tokio::test]
    async fn test_log_delivery_succeeds() {
        let item = ContentItem::builder("rss_1", "https://x/1", "Title").build();
        assert!(LogDelivery.deliver(&item).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_network_error() {
        let delivery =
            WebhookDelivery::new("http://127.0.0.1:1/hook", Duration::from_millis(500)).unwrap();
        let item = ContentItem::builder("rss_1", "https://x/1", "Title").build();
        assert!(matches!(
            delivery.deliver(&item).await,
            Err(AgentError::Network(_))
        ));
    }

    #[test]
    fn test_webhook_rejects_bad_url() {
        assert!(matches!(
            WebhookDelivery::new("not a url", Duration::from_secs(1)),
            Err(AgentError::Config(_))
        ));
    }
}
