//! Follow service
//!
//! Following a remote feed means: create a local record for it, register
//! a pending subscription with a fresh verify token, and ask the remote
//! hub to subscribe us. The hub then confirms asynchronously against the
//! local feed URL; the subscription verifier handles that round-trip.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{Database, EntityId, Feed, Subscription, SubscriptionState};
use crate::error::AppError;
use crate::federation::HubNotifier;
use crate::service::generate_secret;

/// Follow service
pub struct FollowService {
    db: Arc<Database>,
    notifier: HubNotifier,
    base_url: String,
}

impl FollowService {
    /// Create new follow service
    pub fn new(db: Arc<Database>, notifier: HubNotifier, base_url: String) -> Self {
        Self {
            db,
            notifier,
            base_url,
        }
    }

    /// Follow a remote feed through its hub.
    ///
    /// Creates (or reuses) the local record of the remote feed, stores a
    /// pending subscription, and sends the subscribe request. The
    /// subscription only becomes `verified` once the hub completes the
    /// challenge round-trip against our callback URL.
    pub async fn follow(&self, topic_url: &str, hub_url: &str) -> Result<Subscription, AppError> {
        let topic = url::Url::parse(topic_url)
            .map_err(|e| AppError::Validation(format!("Invalid topic URL: {}", e)))?;
        url::Url::parse(hub_url)
            .map_err(|e| AppError::Validation(format!("Invalid hub URL: {}", e)))?;

        let now = Utc::now();

        // Reuse the local record when this topic was followed before.
        let feed = match self.db.get_feed_by_url(topic_url).await? {
            Some(feed) => feed,
            None => {
                let feed = Feed {
                    id: EntityId::new().0,
                    author_id: None,
                    title: remote_feed_title(&topic),
                    url: topic_url.to_string(),
                    hub_secret: generate_secret(32),
                    created_at: now,
                    updated_at: now,
                };
                self.db.insert_feed(&feed).await?;
                feed
            }
        };

        let subscription = Subscription {
            id: EntityId::new().0,
            feed_id: feed.id.clone(),
            topic_url: topic_url.to_string(),
            hub_url: hub_url.to_string(),
            verify_token: generate_secret(16),
            state: SubscriptionState::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_subscription(&subscription).await?;

        let callback = self.callback_url(&feed.id);
        if let Err(e) = self
            .notifier
            .send_subscribe(
                hub_url,
                topic_url,
                &callback,
                &subscription.verify_token,
                &feed.hub_secret,
            )
            .await
        {
            self.db
                .set_subscription_state(&subscription.id, SubscriptionState::Failed)
                .await?;
            return Err(e);
        }

        tracing::info!(
            topic = %topic_url,
            hub = %hub_url,
            subscription_id = %subscription.id,
            "Subscribe request sent, awaiting verification"
        );

        Ok(subscription)
    }

    /// Unfollow a feed.
    ///
    /// Arms the subscription with a fresh single-use token and asks the
    /// hub to unsubscribe; the record is removed when the hub's
    /// unsubscribe verification lands.
    pub async fn unfollow(&self, subscription_id: &str) -> Result<(), AppError> {
        let subscription = self
            .db
            .get_subscription(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let verify_token = generate_secret(16);
        self.db
            .reset_subscription_attempt(&subscription.id, &verify_token)
            .await?;

        let callback = self.callback_url(&subscription.feed_id);
        self.notifier
            .send_unsubscribe(
                &subscription.hub_url,
                &subscription.topic_url,
                &callback,
                &verify_token,
            )
            .await?;

        tracing::info!(
            topic = %subscription.topic_url,
            subscription_id = %subscription.id,
            "Unsubscribe request sent, awaiting verification"
        );

        Ok(())
    }

    fn callback_url(&self, feed_id: &str) -> String {
        format!("{}/feeds/{}.atom", self.base_url.trim_end_matches('/'), feed_id)
    }
}

/// Best-effort display title for a remote topic URL.
fn remote_feed_title(topic: &url::Url) -> String {
    topic
        .host_str()
        .map(|host| host.to_string())
        .unwrap_or_else(|| topic.as_str().to_string())
}
