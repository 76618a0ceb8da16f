//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Per-feed write serialization

mod database;
mod locks;
mod models;

pub use database::Database;
pub use locks::FeedLocks;
pub use models::*;
