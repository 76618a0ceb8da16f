//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Author
// =============================================================================

/// A local account
///
/// Created when signup is confirmed; owns exactly one feed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Feed
// =============================================================================

/// A publication stream
///
/// Either a local author's own feed or the local record of a followed
/// remote feed. The canonical URL is fixed at creation and is the feed's
/// external identity for subscription verification: for local feeds it
/// points at this instance, for remote feeds it is the remote topic URL.
/// The hub secret is the shared HMAC key pushed payloads are signed with.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feed {
    pub id: String,
    /// Owning local author; None for followed remote feeds
    pub author_id: Option<String>,
    /// Feed title (the author's username for local feeds)
    pub title: String,
    /// Canonical public URL, immutable once created
    pub url: String,
    /// Shared secret for X-Hub-Signature verification
    pub hub_secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feed {
    /// Whether this feed is authored on this instance.
    pub fn is_local(&self) -> bool {
        self.author_id.is_some()
    }
}

// =============================================================================
// Update
// =============================================================================

/// A single status update on a feed
///
/// Created by a local post or by ingesting a pushed remote entry.
/// Immutable once created except for author-initiated deletion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Update {
    pub id: String,
    pub feed_id: String,
    /// External Atom entry id, unique per feed
    pub entry_id: String,
    /// Author name as carried in the Atom entry
    pub author_name: String,
    /// Escaped text body
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Subscription
// =============================================================================

/// An outgoing follow awaiting or past hub verification
///
/// References the followed feed by topic URL; `feed_id` points at the
/// local record the hub's verification and pushes arrive on.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: String,
    /// Local record of the followed feed
    pub feed_id: String,
    /// Topic URL of the followed feed (weak reference; usually remote)
    pub topic_url: String,
    /// Hub endpoint the subscribe request was sent to
    pub hub_url: String,
    /// Single-use token echoed back on the verification round-trip
    pub verify_token: String,
    /// State: pending, verified, failed
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription verification state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Pending,
    Verified,
    Failed,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }
}
