use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::models::{Lifecycle, LifecycleEvent};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts lifecycle events to the configured webhook.
///
/// Delivery is best effort: failures are logged and never returned.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<Url>,
}

impl WebhookNotifier {
    pub fn new(url: Option<Url>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .user_agent(concat!("gluestick/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client, url }
    }

    /// Send a lifecycle event. Returns whether it was accepted
    pub async fn trigger(&self, user: &str, lifecycle: Lifecycle) -> bool {
        let Some(url) = &self.url else {
            return false;
        };

        let event = LifecycleEvent {
            user: user.to_string(),
            lifecycle,
        };

        match self.client.post(url.clone()).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(user, %lifecycle, "Webhook delivered");
                true
            }
            Ok(response) => {
                warn!(
                    user,
                    %lifecycle,
                    status = %response.status(),
                    "Webhook rejected the event"
                );
                false
            }
            Err(e) => {
                warn!(user, %lifecycle, "Webhook delivery failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_webhook_is_a_no_op() {
        let notifier = WebhookNotifier::new(None);
        assert!(!notifier.trigger("alice", Lifecycle::FileUploaded).await);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_swallowed() {
        // Port 9 on localhost is expected to refuse connections
        let url = Url::parse("http://127.0.0.1:9/hook").unwrap();
        let notifier = WebhookNotifier::new(Some(url));
        assert!(!notifier.trigger("alice", Lifecycle::DataExported).await);
    }
}
