//! API Handlers
//!
//! HTTP request handlers for each StreamTube endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::FileStore;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, SearchRequest, SearchResponse, SetRequest,
    SetResponse, StatsResponse, StreamResponse, SweepResponse,
};
use crate::search::SearchService;
use crate::tasks::run_maintenance;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Durable result cache
    pub cache: Arc<FileStore>,
    /// Cache-aside search front end
    pub search: Arc<SearchService>,
}

impl AppState {
    /// Creates a new AppState from its shared components.
    pub fn new(cache: Arc<FileStore>, search: SearchService) -> Self {
        Self {
            cache,
            search: Arc::new(search),
        }
    }
}

/// Handler for POST /api/search
pub async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let songs = state.search.search(&req.query).await?;
    Ok(Json(SearchResponse { songs }))
}

/// Handler for GET /api/stream/:video_id
pub async fn stream_handler(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<StreamResponse>> {
    if video_id.trim().is_empty() {
        return Err(CacheError::InvalidArgument("Video id cannot be empty".to_string()));
    }
    Ok(Json(StreamResponse {
        stream_url: state.search.urls().stream_url(&video_id),
    }))
}

/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    state.cache.set(&req.key, &req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let entry = state
        .cache
        .get_entry(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::from_entry(entry, state.cache.now_ms())))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key).await? {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let removed = state.cache.clear().await?;
    Ok(Json(ClearResponse::new(removed)))
}

/// Handler for POST /cache/sweep
///
/// Runs the same pass as the background task, on demand.
pub async fn sweep_handler(State(state): State<AppState>) -> Result<Json<SweepResponse>> {
    let (removed, evicted) = run_maintenance(&state.cache).await?;
    Ok(Json(SweepResponse { removed, evicted }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
