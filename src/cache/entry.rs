//! Cache Entry Module
//!
//! Defines the persisted record for a single key with TTL support.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Entry ==
/// One persisted cache record. Serialized as JSON, one file per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Logical key the record was written under
    pub key: String,
    /// The stored value, opaque to the cache
    pub value: Value,
    /// Time of the `set` that wrote this record (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a record that expires `ttl_seconds` after `now_ms`.
    pub fn new(key: impl Into<String>, value: Value, now_ms: i64, ttl_seconds: u64) -> Self {
        let ttl_ms = i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        Self {
            key: key.into(),
            value,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now_ms >= expires_at`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining lifetime in whole seconds, 0 once expired.
    pub fn ttl_remaining(&self, now_ms: i64) -> u64 {
        let remaining = self.expires_at.saturating_sub(now_ms);
        if remaining > 0 {
            (remaining / 1000) as u64
        } else {
            0
        }
    }

    // == Codec ==
    /// Serializes the record for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| CacheError::InvalidArgument(format!("Value is not serializable: {}", e)))
    }

    /// Parses a stored record, checking it belongs to `expected_key` when given.
    ///
    /// `expected_key` is `None` when the caller only knows the file (sweep).
    pub fn from_bytes(bytes: &[u8], expected_key: Option<&str>) -> Result<Self> {
        let entry: CacheEntry =
            serde_json::from_slice(bytes).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        if let Some(expected) = expected_key {
            if entry.key != expected {
                return Err(CacheError::Corrupt(format!(
                    "record holds key '{}', expected '{}'",
                    entry.key, expected
                )));
            }
        }
        Ok(entry)
    }
}
