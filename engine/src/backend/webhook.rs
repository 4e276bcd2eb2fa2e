//! Webhook backend
//!
//! Serializes each event as JSON and POSTs it to a configured URL. The
//! receiving side decides what a container lifecycle change means; this
//! adapter only guarantees delivery attempts in event order.

use async_trait::async_trait;
use beacon_core::{Backend, BackendError, Event};

/// A backend that publishes events to an HTTP endpoint.
pub struct WebhookBackend {
    client: reqwest::Client,
    url: String,
}

impl WebhookBackend {
    /// Create a webhook backend posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        WebhookBackend {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Backend for WebhookBackend {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn process_event(&self, event: Event) -> Result<(), BackendError> {
        let response = self
            .client
            .post(&self.url)
            .json(&event)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Send(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
