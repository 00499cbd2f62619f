pub mod block;
pub mod model;

pub use block::{Block, SealedBlock, hash_hex, header_bytes, validate_hash};
pub use model::Blockchain;

/// Protocol version prefixed to every serialized header.
pub const DEFAULT_VERSION: &str = "02000000";

/// Default difficulty prefix a winning hash must start with.
pub const DEFAULT_DIFFICULTY_PREFIX: &str = "0000";

/// Default search budget (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Block subsidy credited by the coinbase entry.
pub const BASE_REWARD: u64 = 50;
