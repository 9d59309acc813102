//! Webhook delivery: POSTs each reminder to a configured HTTP endpoint.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use super::DeliveryTransport;

/// Sends reminders as JSON to a single webhook URL.
pub struct WebhookTransport {
    client: reqwest::Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl DeliveryTransport for WebhookTransport {
    async fn send(&self, address: &str, title: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "to": address,
                "content": title,
            }))
            .send()
            .await?;
        response.error_for_status()?;
        debug!("Delivered to {address} via webhook");
        Ok(())
    }
}
