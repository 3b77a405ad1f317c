//! Invidious search provider
//!
//! Queries an Invidious instance's `/api/v1/search` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{SearchProvider, VideoHit};
use crate::error::{CacheError, Result};

#[derive(Debug, Deserialize)]
struct InvidiousSearchResult {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    #[serde(default)]
    title: String,
    author: Option<String>,
    #[serde(rename = "lengthSeconds")]
    length_seconds: Option<u64>,
    #[serde(rename = "videoThumbnails", default)]
    video_thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl InvidiousSearchResult {
    fn into_hit(self) -> Option<VideoHit> {
        if self.kind.as_deref().is_some_and(|kind| kind != "video") {
            return None;
        }
        Some(VideoHit {
            id: self.video_id?,
            title: self.title,
            author: self.author.unwrap_or_default(),
            length_seconds: self.length_seconds,
            thumbnail: self.video_thumbnails.into_iter().next().map(|t| t.url),
        })
    }
}

/// HTTP client for one Invidious instance.
pub struct InvidiousProvider {
    client: reqwest::Client,
    base: String,
}

impl InvidiousProvider {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CacheError::Internal(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for InvidiousProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoHit>> {
        let url = format!("{}/api/v1/search", self.base);
        debug!("Searching {} for '{}'", url, query);

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("type", "video")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CacheError::Upstream(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let results: Vec<InvidiousSearchResult> = response.json().await?;
        Ok(parse_hits(results, limit))
    }
}

fn parse_hits(results: Vec<InvidiousSearchResult>, limit: usize) -> Vec<VideoHit> {
    results
        .into_iter()
        .filter_map(InvidiousSearchResult::into_hit)
        .take(limit)
        .collect()
}
