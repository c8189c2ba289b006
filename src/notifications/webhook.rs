use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, instrument};

use super::{NotificationSink, NotifyError, Payload};
use crate::config::Webhook;

/// Sink that POSTs `{channel, event, data}` to a URL
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(webhook: &Webhook) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(webhook.timeout))
            .build()?;

        Ok(Self {
            client,
            url: webhook.url.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    #[instrument(skip(self, payload), fields(url = %self.url))]
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &Payload,
    ) -> Result<(), NotifyError> {
        let body = json!({
            "channel": channel,
            "event": event,
            "data": payload,
        });

        match self.client.post(&self.url).json(&body).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!("delivered {event}");
                    Ok(())
                } else {
                    error!("webhook rejected {event} with status: {}", response.status());
                    Err(NotifyError::Rejected(response.status().as_u16()))
                }
            }
            Err(e) => {
                error!("failed to deliver {event}: {e}");
                Err(NotifyError::Transport(e.to_string()))
            }
        }
    }
}
