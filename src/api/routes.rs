//! API Routes
//!
//! Configures the Axum router with all StreamTube endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, health_handler, search_handler, set_handler,
    stats_handler, stream_handler, sweep_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /api/search` - Search songs (cached per normalized query)
/// - `GET /api/stream/:video_id` - Stream URL for a video
/// - `PUT /cache` - Store a JSON value
/// - `GET /cache/:key` - Retrieve a value by key
/// - `DELETE /cache/:key` - Delete a key
/// - `DELETE /cache` - Drop every entry
/// - `POST /cache/sweep` - Run a sweep + capacity pass now
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/search", post(search_handler))
        .route("/api/stream/:video_id", get(stream_handler))
        .route("/cache", put(set_handler).delete(clear_handler))
        .route("/cache/sweep", post(sweep_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
