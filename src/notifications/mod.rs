//! Notification sink - outbound real-time status broadcast
//!
//! The core announces status transitions, count changes and schedule changes
//! by publishing `(channel, event, payload)` triples. Delivery is best-effort:
//! [`Notifier`] queues, delivers in the background, and only logs failures.
//!
//! ## Sinks
//!
//! - [`webhook::WebhookSink`]: POSTs each notification as JSON
//! - [`broadcast::BroadcastSink`]: in-process fan-out (WebSocket stream, tests)
//! - [`FanoutSink`]: publishes to several sinks

pub mod broadcast;
pub mod events;
pub mod webhook;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// String-keyed payload; every value is a string
pub type Payload = HashMap<String, String>;

/// One published notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub channel: String,
    pub event: String,
    pub data: Payload,
}

/// Errors a sink may report
#[derive(Debug)]
pub enum NotifyError {
    /// The transport could not deliver the notification
    Transport(String),

    /// The receiving end answered with a non-success status
    Rejected(u16),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Transport(msg) => write!(f, "notification transport failed: {msg}"),
            NotifyError::Rejected(status) => {
                write!(f, "notification rejected with status {status}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// External pub/sub transport
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, channel: &str, event: &str, payload: &Payload)
    -> Result<(), NotifyError>;
}

/// Publishes to every inner sink; reports the first failure after trying all
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &Payload,
    ) -> Result<(), NotifyError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(channel, event, payload).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Notifications waiting for delivery before new ones are dropped
const QUEUE_CAPACITY: usize = 1024;

enum Delivery {
    Publish { event: String, payload: Payload },
    Flush(oneshot::Sender<()>),
}

/// Best-effort publisher bound to one channel
///
/// Publishing only enqueues. A background task hands the queue to the sink
/// in order, so a slow sink never holds up the caller.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<Delivery>,
    channel: String,
}

impl Notifier {
    /// Spawn the delivery task; requires a running tokio runtime
    pub fn new(sink: Arc<dyn NotificationSink>, channel: impl Into<String>) -> Self {
        let channel = channel.into();
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(deliver(receiver, sink, channel.clone()));
        Self { sender, channel }
    }

    /// Queue a notification; failures are logged and never reported
    pub fn publish(&self, event: &str, payload: Payload) {
        let delivery = Delivery::Publish {
            event: event.to_string(),
            payload,
        };
        match self.sender.try_send(delivery) {
            Ok(()) => trace!("queued {event} on {}", self.channel),
            Err(TrySendError::Full(_)) => {
                warn!("notification queue full, dropping {event} on {}", self.channel)
            }
            Err(TrySendError::Closed(_)) => {
                warn!("notification delivery stopped, dropping {event}")
            }
        }
    }

    /// Wait until everything queued so far has been handed to the sink
    pub async fn flush(&self) {
        let (respond_to, done) = oneshot::channel();
        if self.sender.send(Delivery::Flush(respond_to)).await.is_ok() {
            let _ = done.await;
        }
    }
}

async fn deliver(
    mut receiver: mpsc::Receiver<Delivery>,
    sink: Arc<dyn NotificationSink>,
    channel: String,
) {
    while let Some(delivery) = receiver.recv().await {
        match delivery {
            Delivery::Publish { event, payload } => {
                if let Err(e) = sink.publish(&channel, &event, &payload).await {
                    warn!("failed to publish {event} on {channel}: {e}");
                }
            }
            Delivery::Flush(respond_to) => {
                let _ = respond_to.send(());
            }
        }
    }
    debug!("notification delivery for {channel} stopped");
}
