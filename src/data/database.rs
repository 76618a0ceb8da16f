//! SQLite database operations
//!
//! All database access goes through this module.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS authors (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    display_name TEXT,
    email TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feeds (
    id TEXT PRIMARY KEY,
    author_id TEXT REFERENCES authors(id),
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    hub_secret TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feed_hubs (
    feed_id TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    hub_url TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (feed_id, hub_url)
);

CREATE TABLE IF NOT EXISTS updates (
    id TEXT PRIMARY KEY,
    feed_id TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    entry_id TEXT NOT NULL,
    author_name TEXT NOT NULL,
    text TEXT NOT NULL,
    published_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (feed_id, entry_id)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    id TEXT PRIMARY KEY,
    feed_id TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    topic_url TEXT NOT NULL,
    hub_url TEXT NOT NULL,
    verify_token TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_updates_feed_published
    ON updates (feed_id, published_at DESC);
CREATE INDEX IF NOT EXISTS idx_subscriptions_topic
    ON subscriptions (topic_url);
"#;

impl Database {
    /// Connect to the SQLite database at `path`, creating it if missing.
    ///
    /// The schema is applied on every connect; all statements are
    /// `IF NOT EXISTS` so this is safe for existing databases.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        for statement in SCHEMA.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    // =========================================================================
    // Authors
    // =========================================================================

    pub async fn insert_author(&self, author: &Author) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO authors (id, username, display_name, email, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&author.id)
        .bind(&author.username)
        .bind(&author.display_name)
        .bind(&author.email)
        .bind(author.created_at)
        .bind(author.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_author(&self, id: &str) -> Result<Option<Author>, AppError> {
        let author = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    pub async fn get_author_by_username(&self, username: &str) -> Result<Option<Author>, AppError> {
        let author = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    // =========================================================================
    // Feeds
    // =========================================================================

    pub async fn insert_feed(&self, feed: &Feed) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO feeds (id, author_id, title, url, hub_secret, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&feed.id)
        .bind(&feed.author_id)
        .bind(&feed.title)
        .bind(&feed.url)
        .bind(&feed.hub_secret)
        .bind(feed.created_at)
        .bind(feed.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_feed(&self, id: &str) -> Result<Option<Feed>, AppError> {
        let feed = sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(feed)
    }

    pub async fn get_feed_by_author(&self, author_id: &str) -> Result<Option<Feed>, AppError> {
        let feed = sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE author_id = ?")
            .bind(author_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(feed)
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, AppError> {
        let feed = sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(feed)
    }

    // =========================================================================
    // Hub endpoints
    // =========================================================================

    pub async fn add_hub(&self, feed_id: &str, hub_url: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT OR IGNORE INTO feed_hubs (feed_id, hub_url, created_at) VALUES (?, ?, ?)",
        )
        .bind(feed_id)
        .bind(hub_url)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_hub(&self, feed_id: &str, hub_url: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM feed_hubs WHERE feed_id = ? AND hub_url = ?")
            .bind(feed_id)
            .bind(hub_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_hubs(&self, feed_id: &str) -> Result<Vec<String>, AppError> {
        let hubs = sqlx::query_scalar::<_, String>(
            "SELECT hub_url FROM feed_hubs WHERE feed_id = ? ORDER BY created_at",
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(hubs)
    }

    // =========================================================================
    // Updates
    // =========================================================================

    pub async fn insert_update(&self, update: &Update) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO updates (id, feed_id, entry_id, author_name, text, published_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&update.id)
        .bind(&update.feed_id)
        .bind(&update.entry_id)
        .bind(&update.author_name)
        .bind(&update.text)
        .bind(update.published_at)
        .bind(update.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_update(&self, id: &str) -> Result<Option<Update>, AppError> {
        let update = sqlx::query_as::<_, Update>("SELECT * FROM updates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(update)
    }

    /// Updates for a feed, most recent first (publication order).
    pub async fn get_updates(&self, feed_id: &str) -> Result<Vec<Update>, AppError> {
        let updates = sqlx::query_as::<_, Update>(
            "SELECT * FROM updates WHERE feed_id = ?
             ORDER BY published_at DESC, created_at DESC",
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(updates)
    }

    pub async fn update_exists(&self, feed_id: &str, entry_id: &str) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM updates WHERE feed_id = ? AND entry_id = ?",
        )
        .bind(feed_id)
        .bind(entry_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn delete_update(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM updates WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub async fn insert_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO subscriptions (id, feed_id, topic_url, hub_url, verify_token, state, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&subscription.id)
        .bind(&subscription.feed_id)
        .bind(&subscription.topic_url)
        .bind(&subscription.hub_url)
        .bind(&subscription.verify_token)
        .bind(&subscription.state)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, AppError> {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(subscription)
    }

    /// Most recent pending subscription for a topic, if any.
    ///
    /// Verify tokens are single-use per attempt, so only the latest pending
    /// attempt can answer a challenge.
    pub async fn find_pending_subscription(
        &self,
        topic_url: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE topic_url = ? AND state = 'pending'
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(topic_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    /// Arm a subscription for a fresh verification attempt.
    ///
    /// Tokens are single-use, so every attempt (initial subscribe or later
    /// unsubscribe) gets its own token and goes back to pending.
    pub async fn reset_subscription_attempt(
        &self,
        id: &str,
        verify_token: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE subscriptions SET verify_token = ?, state = 'pending', updated_at = ? WHERE id = ?",
        )
        .bind(verify_token)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_subscription_state(
        &self,
        id: &str,
        state: SubscriptionState,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE subscriptions SET state = ?, updated_at = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_subscription(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM subscriptions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
