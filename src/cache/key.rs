//! Cache Key Module
//!
//! Key validation, query normalization and the key -> file name mapping.

use sha3::{Digest, Sha3_256};

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

/// Namespace prefix for search result keys.
pub const SEARCH_PREFIX: &str = "search_";

/// Extension of committed record files.
pub const ENTRY_EXTENSION: &str = "json";

/// Extension of in-flight temporary files.
pub const TEMP_EXTENSION: &str = "tmp";

// == Validate ==
/// Rejects keys the store refuses to address.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidArgument(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Normalize Query ==
/// Trims surrounding whitespace and lowercases a lookup subject, so that
/// queries differing only in case or padding share one entry.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

// == Search Key ==
/// Cache key for a search query.
pub fn search_key(query: &str) -> String {
    format!("{}{}", SEARCH_PREFIX, normalize_query(query))
}

// == File Name ==
/// Stable, filesystem-safe record name for `key`.
///
/// Hex SHA3-256 keeps names bounded and free of path separators whatever
/// the key contains.
pub fn file_name(key: &str) -> String {
    format!("{}.{}", file_stem(key), ENTRY_EXTENSION)
}

/// Record name without extension; also the per-key lock id.
pub fn file_stem(key: &str) -> String {
    let digest = Sha3_256::digest(key.as_bytes());
    hex::encode(digest)
}
