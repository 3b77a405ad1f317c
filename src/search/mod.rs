//! Search Module
//!
//! Turns provider search hits into playable songs, caching results per
//! normalized query.

mod invidious;
mod service;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use invidious::InvidiousProvider;
pub use service::SearchService;

// == Song ==
/// A playable search result as served to clients and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Display duration, e.g. `3:25`
    pub duration: String,
    pub thumbnail: String,
    /// Stream URL for the player
    pub url: String,
}

// == Video Hit ==
/// Raw result from a search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoHit {
    pub id: String,
    pub title: String,
    pub author: String,
    pub length_seconds: Option<u64>,
    pub thumbnail: Option<String>,
}

// == Provider Trait ==
/// External video search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoHit>>;
}

// == Stream URLs ==
/// Builds `{base}/{video_id}?key={api_key}` stream URLs.
#[derive(Debug, Clone)]
pub struct StreamUrlBuilder {
    base: String,
    api_key: String,
}

impl StreamUrlBuilder {
    pub fn new(base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn stream_url(&self, video_id: &str) -> String {
        format!("{}/{}?key={}", self.base, video_id, self.api_key)
    }

    /// Converts a provider hit into a song with a stream URL.
    pub fn song_from_hit(&self, hit: VideoHit) -> Song {
        Song {
            url: self.stream_url(&hit.id),
            duration: hit.length_seconds.map(format_duration).unwrap_or_default(),
            thumbnail: hit.thumbnail.unwrap_or_default(),
            artist: hit.author,
            title: hit.title,
            id: hit.id,
        }
    }
}

/// Formats seconds as `m:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url() {
        let urls = StreamUrlBuilder::new("http://example.com/stream/", "secret");
        assert_eq!(urls.stream_url("abc123"), "http://example.com/stream/abc123?key=secret");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(205), "3:25");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn test_song_from_hit() {
        let urls = StreamUrlBuilder::new("http://example.com/stream", "k");
        let song = urls.song_from_hit(VideoHit {
            id: "abc123".into(),
            title: "Lofi Beats".into(),
            author: "Chill Channel".into(),
            length_seconds: Some(95),
            thumbnail: None,
        });

        assert_eq!(song.id, "abc123");
        assert_eq!(song.artist, "Chill Channel");
        assert_eq!(song.duration, "1:35");
        assert_eq!(song.thumbnail, "");
        assert_eq!(song.url, "http://example.com/stream/abc123?key=k");
    }
}
