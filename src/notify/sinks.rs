use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::notify::ports::NotificationSink;

#[derive(Debug, Clone, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, message: &str) {
        tracing::info!(target: "notify", message = %message, "user_notification");
    }
}

#[derive(Debug, Clone, Default)]
pub struct StderrNotificationSink;

#[async_trait]
impl NotificationSink for StderrNotificationSink {
    async fn notify(&self, message: &str) {
        eprintln!("[notification] {message}");
    }
}

fn default_webhook_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSinkConfig {
    pub url: String,
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": ...}` to a chat-style webhook. Failures are logged and dropped.
pub struct WebhookNotificationSink {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl WebhookNotificationSink {
    pub fn new(config: &WebhookSinkConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .with_context(|| format!("invalid webhook url '{}'", config.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported webhook url scheme '{}'",
                url.scheme()
            ));
        }
        let client = Client::builder()
            .build()
            .context("failed to build webhook http client")?;
        Ok(Self {
            client,
            url,
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(&self, message: &str) {
        let result = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(&WebhookPayload { text: message })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    target: "notify",
                    url = %self.url,
                    status = response.status().as_u16(),
                    "webhook_delivery_rejected"
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "notify",
                    url = %self.url,
                    error = %err,
                    "webhook_delivery_failed"
                );
            }
        }
    }
}

/// Delivers every message to all inner sinks concurrently.
pub struct FanoutNotificationSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutNotificationSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanoutNotificationSink {
    async fn notify(&self, message: &str) {
        join_all(self.sinks.iter().map(|sink| sink.notify(message))).await;
    }
}
