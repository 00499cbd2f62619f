pub mod builder;
pub mod search;
pub mod session;

pub use builder::Candidate;
pub use search::{SearchOutcome, find_nonce};
pub use session::MiningSession;

use chrono::Utc;

/// Current Unix time in milliseconds; clamps pre-epoch clocks to 0.
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
