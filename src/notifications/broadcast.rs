use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use super::{Notification, NotificationSink, NotifyError, Payload};

/// In-process sink backed by a Tokio broadcast channel
///
/// Slow subscribers may lag and miss notifications; having no subscribers at
/// all is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<Notification> {
        self.sender.clone()
    }
}

#[async_trait]
impl NotificationSink for BroadcastSink {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &Payload,
    ) -> Result<(), NotifyError> {
        let notification = Notification {
            channel: channel.to_string(),
            event: event.to_string(),
            data: payload.clone(),
        };

        if self.sender.send(notification).is_err() {
            trace!("no subscribers for {event}");
        }
        Ok(())
    }
}
