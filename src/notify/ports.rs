use async_trait::async_trait;

/// Human-facing delivery channel. Delivery problems stay inside the sink.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: &str);
}
