//! Hub notification and subscription requests.
//!
//! Outbound traffic to PubSubHubbub hubs: publish pings after a local
//! post, and subscribe/unsubscribe requests when a user follows or
//! unfollows a remote feed.

use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::HUB_PINGS_TOTAL;

/// Hub notification service
///
/// Sends `hub.mode=publish` pings to every hub registered on a feed.
/// Fire-and-forget per call: failures are logged and counted, never
/// retried, and never propagate to the publish operation that triggered
/// the fan-out.
#[derive(Clone)]
pub struct HubNotifier {
    http_client: Arc<reqwest::Client>,
    max_concurrent: usize,
}

/// Result of a single hub ping
#[derive(Debug, Clone)]
pub struct PingResult {
    /// Hub endpoint URL
    pub hub_url: String,
    /// Whether the hub answered 2xx
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
}

impl HubNotifier {
    /// Create new notifier
    ///
    /// The client's timeout bounds every hub exchange; a hub that exceeds
    /// it counts as a failed delivery.
    pub fn new(http_client: Arc<reqwest::Client>, max_concurrent: usize) -> Self {
        Self {
            http_client,
            max_concurrent,
        }
    }

    /// Ping a single hub that `topic_url` has new content.
    pub async fn ping_hub(&self, hub_url: &str, topic_url: &str) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(hub_url)
            .form(&[("hub.mode", "publish"), ("hub.url", topic_url)])
            .send()
            .await
            .map_err(|e| AppError::Federation(format!("Failed to ping {}: {}", hub_url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Federation(format!(
                "Hub {} rejected ping: HTTP {}",
                hub_url,
                response.status()
            )));
        }

        Ok(())
    }

    /// Notify all hubs registered on a feed.
    ///
    /// # Arguments
    /// * `topic_url` - The feed's canonical URL
    /// * `hub_urls` - Registered hub endpoints
    ///
    /// # Returns
    /// Number of hubs that acknowledged the ping.
    pub async fn notify(&self, topic_url: &str, hub_urls: Vec<String>) -> usize {
        use tokio::sync::Semaphore;

        if hub_urls.is_empty() {
            return 0;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = Vec::new();

        for hub_url in hub_urls {
            let semaphore = semaphore.clone();
            let topic_url = topic_url.to_string();
            let self_clone = self.clone();

            let task = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");

                let result = self_clone.ping_hub(&hub_url, &topic_url).await;

                PingResult {
                    hub_url,
                    success: result.is_ok(),
                    error: result.err().map(|e| e.to_string()),
                }
            });

            tasks.push(task);
        }

        let mut success_count = 0;
        let mut failure_count = 0;
        for task in tasks {
            if let Ok(result) = task.await {
                if result.success {
                    success_count += 1;
                    HUB_PINGS_TOTAL.with_label_values(&["success"]).inc();
                } else {
                    failure_count += 1;
                    HUB_PINGS_TOTAL.with_label_values(&["failure"]).inc();
                    tracing::warn!(
                        hub = %result.hub_url,
                        error = ?result.error,
                        "Hub ping failed"
                    );
                }
            }
        }

        tracing::info!(
            topic = %topic_url,
            succeeded = success_count,
            failed = failure_count,
            "Hub notification complete"
        );

        success_count
    }

    /// Send a subscribe request to a remote feed's hub.
    ///
    /// The hub will answer with an asynchronous verification GET against
    /// `callback_url` carrying the verify token. The shared secret is what
    /// the hub will sign pushed payloads with (`X-Hub-Signature`).
    pub async fn send_subscribe(
        &self,
        hub_url: &str,
        topic_url: &str,
        callback_url: &str,
        verify_token: &str,
        secret: &str,
    ) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(hub_url)
            .form(&[
                ("hub.mode", "subscribe"),
                ("hub.topic", topic_url),
                ("hub.callback", callback_url),
                ("hub.verify", "async"),
                ("hub.verify_token", verify_token),
                ("hub.secret", secret),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::Federation(format!("Failed to reach hub {}: {}", hub_url, e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Federation(format!(
                "Hub {} rejected subscribe request: HTTP {}",
                hub_url,
                response.status()
            )));
        }

        tracing::info!(hub = %hub_url, topic = %topic_url, "Subscribe request accepted");
        Ok(())
    }

    /// Send an unsubscribe request to a remote feed's hub.
    pub async fn send_unsubscribe(
        &self,
        hub_url: &str,
        topic_url: &str,
        callback_url: &str,
        verify_token: &str,
    ) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(hub_url)
            .form(&[
                ("hub.mode", "unsubscribe"),
                ("hub.topic", topic_url),
                ("hub.callback", callback_url),
                ("hub.verify", "async"),
                ("hub.verify_token", verify_token),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::Federation(format!("Failed to reach hub {}: {}", hub_url, e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Federation(format!(
                "Hub {} rejected unsubscribe request: HTTP {}",
                hub_url,
                response.status()
            )));
        }

        tracing::info!(hub = %hub_url, topic = %topic_url, "Unsubscribe request accepted");
        Ok(())
    }
}
