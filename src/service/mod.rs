//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database, lock, and federation operations.

mod account;
mod follow;
mod update;

pub use account::AccountService;
pub use follow::FollowService;
pub use update::UpdateService;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random alphanumeric secret for verify tokens and hub shared secrets.
pub fn generate_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
