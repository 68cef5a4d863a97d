use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::config::UsageConfig;

/// Anonymous usage statistics.
///
/// One tracker is built at startup and shared through the application
/// state. Every process gets a fresh anonymous id; nothing identifying the
/// user or their data is sent.
#[derive(Debug, Clone)]
pub struct UsageTracker {
    inner: Option<Arc<TrackerInner>>,
}

#[derive(Debug)]
struct TrackerInner {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    anon_id: String,
}

impl UsageTracker {
    pub fn new(config: &UsageConfig) -> Self {
        if !config.enabled {
            return Self { inner: None };
        }

        let anon_id = Uuid::new_v4().simple().to_string()[..10].to_string();
        Self {
            inner: Some(Arc::new(TrackerInner {
                client: reqwest::Client::new(),
                endpoint: config.endpoint.clone(),
                token: config.token.clone(),
                anon_id,
            })),
        }
    }

    pub fn anon_id(&self) -> Option<&str> {
        self.inner.as_ref().map(|i| i.anon_id.as_str())
    }

    /// Record an event in the background; never blocks the caller
    pub fn track(&self, event: &'static str) {
        let Some(inner) = self.inner.clone() else {
            return;
        };

        tokio::spawn(async move {
            let body = json!([{
                "event": event,
                "properties": {
                    "token": inner.token,
                    "distinct_id": inner.anon_id,
                }
            }]);

            match inner.client.post(&inner.endpoint).json(&body).send().await {
                Ok(response) => debug!(event, status = %response.status(), "Usage event sent"),
                Err(e) => debug!(event, "Usage event not sent: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> UsageConfig {
        UsageConfig {
            enabled,
            endpoint: "http://127.0.0.1:9/track".to_string(),
            token: "test".to_string(),
        }
    }

    #[test]
    fn test_disabled_tracker_has_no_id() {
        let tracker = UsageTracker::new(&config(false));
        assert!(tracker.anon_id().is_none());
        tracker.track("Status");
    }

    #[tokio::test]
    async fn test_enabled_tracker_is_anonymous_per_instance() {
        let a = UsageTracker::new(&config(true));
        let b = UsageTracker::new(&config(true));
        assert_eq!(a.anon_id().unwrap().len(), 10);
        assert_ne!(a.anon_id(), b.anon_id());
        a.track("Status");
    }
}
