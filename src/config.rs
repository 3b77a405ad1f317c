//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::StoreConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding cache record files
    pub cache_dir: PathBuf,
    /// Default TTL in seconds for cached entries
    pub default_ttl: u64,
    /// Optional cap on live cache entries
    pub max_entries: Option<usize>,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the stream endpoint
    pub stream_api_base: String,
    /// Key appended to stream URLs
    pub stream_api_key: String,
    /// Base URL of the Invidious-compatible search instance
    pub search_api_base: String,
    /// Results requested per search
    pub max_results: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Cache root directory (default: ./cache)
    /// - `CACHE_TIMEOUT` - Default TTL in seconds (default: 3600)
    /// - `MAX_CACHE_SIZE` - Maximum live cache entries (default: unbounded)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `STREAM_API_BASE` - Stream URL base
    /// - `STREAM_API_KEY` - Stream URL key (default: empty)
    /// - `SEARCH_API_BASE` - Search instance base URL
    /// - `MAX_RESULTS` - Results per search (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            default_ttl: parse_var("CACHE_TIMEOUT")
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.default_ttl),
            max_entries: parse_var("MAX_CACHE_SIZE").filter(|max| *max > 0),
            sweep_interval: parse_var("SWEEP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.sweep_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            stream_api_base: env::var("STREAM_API_BASE").unwrap_or(defaults.stream_api_base),
            stream_api_key: env::var("STREAM_API_KEY").unwrap_or(defaults.stream_api_key),
            search_api_base: env::var("SEARCH_API_BASE").unwrap_or(defaults.search_api_base),
            max_results: parse_var("MAX_RESULTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_results),
        }
    }

    /// Cache store parameters derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            root: self.cache_dir.clone(),
            default_ttl: self.default_ttl,
            max_entries: self.max_entries,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            default_ttl: 3600,
            max_entries: None,
            sweep_interval: 300,
            server_port: 8080,
            stream_api_base: "http://deadlinetech.site/stream".to_string(),
            stream_api_key: String::new(),
            search_api_base: "https://yewtu.be".to_string(),
            max_results: 10,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.max_entries, None);
        assert_eq!(config.sweep_interval, 300);
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.max_results, 10);
    }

    #[test]
    fn test_store_config_mirrors_config() {
        let config = Config {
            cache_dir: PathBuf::from("/tmp/streamtube"),
            default_ttl: 60,
            max_entries: Some(500),
            ..Config::default()
        };

        let store = config.store_config();
        assert_eq!(store.root, PathBuf::from("/tmp/streamtube"));
        assert_eq!(store.default_ttl, 60);
        assert_eq!(store.max_entries, Some(500));
    }

    // Single test touching the environment, so parallel tests don't race on it.
    #[test]
    fn test_config_from_env() {
        env::set_var("CACHE_TIMEOUT", "120");
        env::set_var("MAX_CACHE_SIZE", "50");
        env::set_var("SWEEP_INTERVAL", "not-a-number");
        env::set_var("MAX_RESULTS", "0");

        let config = Config::from_env();
        assert_eq!(config.default_ttl, 120);
        assert_eq!(config.max_entries, Some(50));
        assert_eq!(config.sweep_interval, 300);
        assert_eq!(config.max_results, 10);

        env::remove_var("CACHE_TIMEOUT");
        env::remove_var("MAX_CACHE_SIZE");
        env::remove_var("SWEEP_INTERVAL");
        env::remove_var("MAX_RESULTS");

        let config = Config::from_env();
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.max_entries, None);
    }
}
