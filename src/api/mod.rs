//! API layer
//!
//! HTTP handlers for:
//! - Feeds (Atom serving, hub challenges, signed pushes)
//! - Updates (publish/delete)
//! - Subscriptions (follow/unfollow)
//! - Metrics (Prometheus)

mod feeds;
pub mod metrics;
mod subscriptions;
mod updates;

pub use feeds::feeds_router;
pub use metrics::metrics_router;
pub use subscriptions::subscriptions_router;
pub use updates::updates_router;
