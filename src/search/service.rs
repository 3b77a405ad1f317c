//! Search Service
//!
//! Cache-aside search: look up the normalized query in the store, fall back
//! to the provider on a miss and remember what it returned.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{SearchProvider, Song, StreamUrlBuilder};
use crate::cache::{normalize_query, search_key, FileStore};
use crate::error::{CacheError, Result};

/// Search front end shared by the HTTP handlers.
///
/// Concurrent misses for the same query each reach the provider; the last
/// write wins in the cache.
pub struct SearchService {
    cache: Arc<FileStore>,
    provider: Arc<dyn SearchProvider>,
    urls: StreamUrlBuilder,
    max_results: usize,
    ttl: Option<u64>,
}

impl SearchService {
    pub fn new(
        cache: Arc<FileStore>,
        provider: Arc<dyn SearchProvider>,
        urls: StreamUrlBuilder,
        max_results: usize,
    ) -> Self {
        Self {
            cache,
            provider,
            urls,
            max_results,
            ttl: None,
        }
    }

    /// Overrides the store's default TTL for search results.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    pub fn urls(&self) -> &StreamUrlBuilder {
        &self.urls
    }

    // == Search ==
    /// Returns songs for `query`, from cache when possible.
    pub async fn search(&self, query: &str) -> Result<Vec<Song>> {
        if normalize_query(query).is_empty() {
            return Err(CacheError::InvalidArgument("Query cannot be empty".to_string()));
        }

        let key = search_key(query);
        if let Some(songs) = self.cache.get_as::<Vec<Song>>(&key).await {
            debug!("Search cache hit for '{}'", key);
            return Ok(songs);
        }

        let hits = self
            .provider
            .search(&normalize_query(query), self.max_results)
            .await?;
        let songs: Vec<Song> = hits
            .into_iter()
            .take(self.max_results)
            .map(|hit| self.urls.song_from_hit(hit))
            .collect();
        info!("Search '{}' returned {} songs from provider", key, songs.len());

        // A failed write only costs us the next lookup
        if let Err(err) = self.cache.set(&key, &songs, self.ttl).await {
            warn!("Could not cache results for '{}': {}", key, err);
        }

        Ok(songs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, StoreConfig};
    use crate::search::VideoHit;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Provider that counts calls and echoes the query back as a title.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SearchProvider for CountingProvider {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CacheError::Upstream("provider down".to_string()));
            }
            Ok((0..limit + 2)
                .map(|i| VideoHit {
                    id: format!("vid{}", i),
                    title: format!("{} #{}", query, i),
                    author: "artist".to_string(),
                    length_seconds: Some(60 + i as u64),
                    thumbnail: Some(format!("http://img/{}.jpg", i)),
                })
                .collect())
        }
    }

    async fn service(
        dir: &TempDir,
        provider: Arc<CountingProvider>,
    ) -> (SearchService, Arc<FileStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let config = StoreConfig {
            root: dir.path().to_path_buf(),
            default_ttl: 3600,
            max_entries: None,
        };
        let cache = Arc::new(FileStore::with_clock(config, clock.clone()).await.unwrap());
        let urls = StreamUrlBuilder::new("http://stream.test", "key");
        let service = SearchService::new(cache.clone(), provider, urls, 3);
        (service, cache, clock)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::default());
        let (service, cache, _) = service(&dir, provider.clone()).await;

        let first = service.search("Lofi Beats").await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].title, "lofi beats #0");
        assert_eq!(first[0].url, "http://stream.test/vid0?key=key");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let second = service.search("  lofi beats ").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        assert!(cache.get("search_lofi beats").await.is_some());
    }

    #[tokio::test]
    async fn test_expired_results_are_refetched() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::default());
        let (service, _, clock) = service(&dir, provider.clone()).await;
        let service = service.with_ttl(60);

        service.search("jazz").await.unwrap();
        clock.advance_secs(61);
        service.search("jazz").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::default());
        let (service, _, _) = service(&dir, provider.clone()).await;

        let result = service.search("   ").await;
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..Default::default()
        });
        let (service, cache, _) = service(&dir, provider).await;

        let result = service.search("rock").await;
        assert!(matches!(result, Err(CacheError::Upstream(_))));
        assert!(cache.get("search_rock").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_songs() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(CountingProvider::default());
        let (service, cache, _) = service(&dir, provider).await;

        std::fs::remove_dir_all(cache.root()).unwrap();

        let songs = service.search("blues").await.unwrap();
        assert_eq!(songs.len(), 3);
    }
}
