//! Per-feed write serialization
//!
//! A feed's update list and hub set are shared mutable state: a push
//! ingestion, a local post, and a hub registration may all target the same
//! feed concurrently. Mutations go through the feed's keyed async mutex;
//! feeds are independent, so there is no global lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Keyed async mutexes, one per feed id.
#[derive(Default)]
pub struct FeedLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FeedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock handle for a feed, creating it on first use.
    ///
    /// Callers hold the returned handle and `.lock().await` it; the map
    /// itself is only touched briefly under the std mutex.
    pub fn for_feed(&self, feed_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("feed lock map poisoned");
        map.entry(feed_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
