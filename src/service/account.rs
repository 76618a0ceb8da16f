//! Account service
//!
//! Handles signup finalization: once a signup is confirmed, the author
//! record and their feed come into existence together. The feed's
//! canonical URL is computed here, once, and never changes afterwards.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{Author, Database, EntityId, Feed};
use crate::error::AppError;
use crate::service::generate_secret;

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    base_url: String,
    /// Hub endpoints every locally authored feed advertises
    default_hubs: Vec<String>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, base_url: String, default_hubs: Vec<String>) -> Self {
        Self {
            db,
            base_url,
            default_hubs,
        }
    }

    /// Finalize a confirmed signup.
    ///
    /// Creates the author and their feed. The feed URL is derived from the
    /// configured base URL and the feed id; it is the identity remote hubs
    /// verify subscriptions against.
    ///
    /// # Errors
    /// `Validation` if the username is empty or already taken.
    pub async fn finalize_signup(
        &self,
        username: &str,
        display_name: Option<String>,
        email: Option<String>,
    ) -> Result<(Author, Feed), AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AppError::Validation(
                "username may only contain letters, digits, '_' and '-'".to_string(),
            ));
        }

        if self.db.get_author_by_username(username).await?.is_some() {
            return Err(AppError::Validation(format!(
                "username {} is already taken",
                username
            )));
        }

        let now = Utc::now();
        let author = Author {
            id: EntityId::new().0,
            username: username.to_string(),
            display_name,
            email,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_author(&author).await?;

        let feed_id = EntityId::new().0;
        let feed = Feed {
            url: format!(
                "{}/feeds/{}.atom",
                self.base_url.trim_end_matches('/'),
                feed_id
            ),
            id: feed_id,
            author_id: Some(author.id.clone()),
            title: author.username.clone(),
            hub_secret: generate_secret(32),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_feed(&feed).await?;

        for hub in &self.default_hubs {
            self.db.add_hub(&feed.id, hub).await?;
        }

        tracing::info!(
            username = %author.username,
            feed_url = %feed.url,
            "Account finalized"
        );

        Ok((author, feed))
    }
}
