//! Best-effort event publishing to an external collector.
//!
//! Publishing happens after the owning transaction commits and must never
//! fail it: every error is logged and swallowed. With no collector URL
//! configured the publisher is a no-op.

use serde_json::json;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct EventPublisher {
    client: reqwest::Client,
    collector_url: Option<String>,
}

impl EventPublisher {
    pub fn new(collector_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            collector_url,
        }
    }

    /// Publish one named event with a JSON payload. Fire-and-forget.
    pub async fn publish(&self, event_type: &str, payload: serde_json::Value) {
        let Some(url) = self.collector_url.as_deref() else {
            debug!(event_type, "Event publishing disabled, dropping event");
            return;
        };

        let body = json!({
            "event_type": event_type,
            "payload": payload,
        });

        match self.client.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(event_type, "Event published");
            }
            Ok(response) => {
                warn!(
                    event_type,
                    status = %response.status(),
                    "Event collector rejected event"
                );
            }
            Err(e) => {
                warn!(event_type, error = %e, "Failed to publish event");
            }
        }
    }
}
