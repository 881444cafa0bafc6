pub mod noop;
pub mod ports;
pub mod sinks;

pub use noop::NoopNotificationSink;
pub use ports::NotificationSink;
pub use sinks::{
    FanoutNotificationSink, StderrNotificationSink, TracingNotificationSink,
    WebhookNotificationSink, WebhookSinkConfig,
};
