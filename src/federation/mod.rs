//! OStatus federation module
//!
//! Handles:
//! - Atom feed rendering/parsing
//! - Hub publish notification
//! - Subscription challenge verification
//! - Signed push ingestion

pub mod atom;
mod hub;
mod ingest;
mod signature;
mod subscription;

pub use hub::{HubNotifier, PingResult};
pub use ingest::{IngestOutcome, UpdateIngestor};
pub use signature::{sign, verify};
pub use subscription::{handle_challenge, ChallengeOutcome, ChallengeParams};
