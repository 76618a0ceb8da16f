//! Inbound push processing.
//!
//! A remote publisher POSTs a signed Atom payload at a feed's URL. The
//! payload is authenticated, parsed, and merged entry-by-entry; the whole
//! body is discarded on a signature or parse failure, nothing partial is
//! ever applied. Duplicate entries are a normal consequence of
//! at-least-once hub delivery and are skipped, never errors.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{Database, EntityId, Feed, FeedLocks, Update};
use crate::error::AppError;
use crate::federation::{atom, signature};
use crate::metrics::PUSH_ENTRIES_TOTAL;

/// Counts returned from one push ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Entries newly created on the feed
    pub accepted: usize,
    /// Entries skipped as already-known duplicates
    pub skipped: usize,
}

/// Inbound update processor
///
/// Merges pushed entries into a feed. Safe under concurrent ingestion:
/// all mutation of one feed happens under its keyed lock, so simultaneous
/// pushes from several publishers (or a push racing a local post) cannot
/// lose updates or create duplicates.
#[derive(Clone)]
pub struct UpdateIngestor {
    db: Arc<Database>,
    locks: Arc<FeedLocks>,
}

impl UpdateIngestor {
    pub fn new(db: Arc<Database>, locks: Arc<FeedLocks>) -> Self {
        Self { db, locks }
    }

    /// Ingest a signed Atom payload pushed for `feed`.
    ///
    /// # Steps
    /// 1. Verify the `X-Hub-Signature` header against the raw body
    /// 2. Parse the body as an Atom document
    /// 3. Under the feed lock, append each unknown entry; skip known ones
    ///
    /// # Errors
    /// - `InvalidSignature`: header absent or mismatched; payload discarded
    /// - `MalformedDocument`: body is not a parseable Atom document
    pub async fn ingest(
        &self,
        feed: &Feed,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<IngestOutcome, AppError> {
        signature::verify(signature_header, raw_body, &feed.hub_secret)?;

        // Parse the full payload before touching any state.
        let entries = atom::parse(raw_body)?;

        let lock = self.locks.for_feed(&feed.id);
        let _guard = lock.lock().await;

        let mut accepted = 0;
        let mut skipped = 0;

        for entry in entries {
            if self.db.update_exists(&feed.id, &entry.entry_id).await? {
                skipped += 1;
                PUSH_ENTRIES_TOTAL.with_label_values(&["skipped"]).inc();
                continue;
            }

            let update = Update {
                id: EntityId::new().0,
                feed_id: feed.id.clone(),
                entry_id: entry.entry_id,
                author_name: entry.author_name,
                text: entry.text,
                published_at: entry.published_at,
                created_at: Utc::now(),
            };
            self.db.insert_update(&update).await?;
            accepted += 1;
            PUSH_ENTRIES_TOTAL.with_label_values(&["accepted"]).inc();
        }

        tracing::info!(
            feed_id = %feed.id,
            accepted,
            skipped,
            "Push payload ingested"
        );

        Ok(IngestOutcome { accepted, skipped })
    }
}
