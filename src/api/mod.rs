//! API Module
//!
//! HTTP handlers and routing for the StreamTube REST API.
//!
//! # Endpoints
//! - `POST /api/search` - Search songs
//! - `GET /api/stream/:video_id` - Stream URL for a video
//! - `PUT /cache`, `GET /cache/:key`, `DELETE /cache/:key`, `DELETE /cache` - Cache admin
//! - `POST /cache/sweep` - Run a sweep pass
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
