use async_trait::async_trait;

use crate::notify::ports::NotificationSink;

#[derive(Debug, Clone, Default)]
pub struct NoopNotificationSink;

#[async_trait]
impl NotificationSink for NoopNotificationSink {
    async fn notify(&self, _message: &str) {}
}
