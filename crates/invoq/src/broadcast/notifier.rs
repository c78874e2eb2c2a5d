//! Realtime notifications for OCR outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::NotifyError;

pub const EVENT_OCR_COMPLETED: &str = "ocr.completed";
pub const EVENT_OCR_FAILED: &str = "ocr.failed";

/// Channel all events for one tenant are published on.
pub fn tenant_channel(tenant_id: &str) -> String {
    format!("tenant-{}", tenant_id)
}

/// A published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait RealtimeNotifier: Send + Sync {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// Publishes and swallows failures. Notification never affects the
/// outcome of the operation that triggered it.
pub async fn publish_best_effort(
    notifier: &dyn RealtimeNotifier,
    channel: &str,
    event: &str,
    payload: serde_json::Value,
) {
    if let Err(e) = notifier.publish(channel, event, payload).await {
        tracing::warn!(channel, event, "Realtime notification failed: {}", e);
    }
}

/// In-process notifier on a tokio broadcast channel.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: Arc<broadcast::Sender<RealtimeEvent>>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl RealtimeNotifier for BroadcastNotifier {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        let event = RealtimeEvent {
            channel: channel.to_string(),
            event: event.to_string(),
            payload,
            timestamp: Utc::now(),
        };
        // No active receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl RealtimeNotifier for FailingNotifier {
        async fn publish(
            &self,
            channel: &str,
            event: &str,
            _payload: serde_json::Value,
        ) -> Result<(), NotifyError> {
            Err(NotifyError::Publish {
                channel: channel.to_string(),
                event: event.to_string(),
                reason: "socket closed".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier
            .publish(
                &tenant_channel("t1"),
                EVENT_OCR_COMPLETED,
                serde_json::json!({"documentId": "d1"}),
            )
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel, "tenant-t1");
        assert_eq!(event.event, "ocr.completed");
        assert_eq!(event.payload["documentId"], "d1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let notifier = BroadcastNotifier::default();
        assert!(notifier
            .publish("tenant-t1", EVENT_OCR_FAILED, serde_json::Value::Null)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        publish_best_effort(
            &FailingNotifier,
            "tenant-t1",
            EVENT_OCR_FAILED,
            serde_json::Value::Null,
        )
        .await;
    }
}
