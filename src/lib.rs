//! StreamTube - music search front end with a durable result cache
//!
//! Search results are memoized per normalized query in a file-backed TTL
//! cache that survives restarts and is swept in the background.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod search;
pub mod tasks;

pub use api::AppState;
pub use cache::{FileStore, StoreConfig};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
