//! Update service
//!
//! Handles posting and deleting local status updates, including the hub
//! fan-out after a successful post.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{Database, EntityId, FeedLocks, Update};
use crate::error::AppError;
use crate::federation::HubNotifier;

/// Update service
pub struct UpdateService {
    db: Arc<Database>,
    locks: Arc<FeedLocks>,
    notifier: HubNotifier,
    base_url: String,
}

impl UpdateService {
    /// Create new update service
    pub fn new(
        db: Arc<Database>,
        locks: Arc<FeedLocks>,
        notifier: HubNotifier,
        base_url: String,
    ) -> Self {
        Self {
            db,
            locks,
            notifier,
            base_url,
        }
    }

    /// Publish a new update on an author's feed.
    ///
    /// Appends the update under the feed lock, then pings the feed's hubs.
    /// The post succeeds locally no matter what the hubs do; hub failures
    /// are logged inside the notifier and surface only in the returned
    /// ping count.
    ///
    /// # Returns
    /// The created update and the number of hubs that acknowledged.
    pub async fn publish(&self, username: &str, text: &str) -> Result<(Update, usize), AppError> {
        let author = self
            .db
            .get_author_by_username(username)
            .await?
            .ok_or(AppError::NotFound)?;
        let feed = self
            .db
            .get_feed_by_author(&author.id)
            .await?
            .ok_or(AppError::UnknownFeed)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("update text is required".to_string()));
        }

        let update_id = EntityId::new().0;
        let update = Update {
            entry_id: format!(
                "{}/updates/{}",
                self.base_url.trim_end_matches('/'),
                update_id
            ),
            id: update_id,
            feed_id: feed.id.clone(),
            author_name: author.username.clone(),
            text: html_escape::encode_text(text).into_owned(),
            published_at: Utc::now(),
            created_at: Utc::now(),
        };

        {
            let lock = self.locks.for_feed(&feed.id);
            let _guard = lock.lock().await;
            self.db.insert_update(&update).await?;
        }

        // Tell hubs there is a new entry. Fan-out happens outside the feed
        // lock; hubs re-fetch against a consistent snapshot.
        let hubs = self.db.get_hubs(&feed.id).await?;
        let pinged = self.notifier.notify(&feed.url, hubs).await;

        Ok((update, pinged))
    }

    /// Delete an update, author-only.
    pub async fn delete(&self, update_id: &str, username: &str) -> Result<(), AppError> {
        let update = self
            .db
            .get_update(update_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let feed = self
            .db
            .get_feed(&update.feed_id)
            .await?
            .ok_or(AppError::UnknownFeed)?;
        let owner = match &feed.author_id {
            Some(author_id) => self.db.get_author(author_id).await?,
            None => None,
        };

        match owner {
            Some(author) if author.username == username => {
                let lock = self.locks.for_feed(&feed.id);
                let _guard = lock.lock().await;
                self.db.delete_update(update_id).await?;
                tracing::info!(update_id = %update_id, username = %username, "Update deleted");
                Ok(())
            }
            _ => Err(AppError::Forbidden),
        }
    }
}
