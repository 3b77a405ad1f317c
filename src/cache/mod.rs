//! Cache Module
//!
//! Provides a durable, file-backed cache with TTL expiration, sweeping and
//! least-recently-set capacity eviction.

mod clock;
mod entry;
pub mod key;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{normalize_query, search_key};
pub use stats::{CacheStats, StatsRecorder};
pub use store::{FileStore, StoreConfig, STALE_TEMP_AGE};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed serialized record size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
