//! riffbank - riff catalog with acoustic similarity search
//!
//! Stores short recordings ("riffs") with JSON metadata and serves a
//! similarity query: given one riff, rank the catalog by acoustic distance
//! over fixed-length fingerprints. The analysis pipeline lives in
//! [`analysis`], ranking and caching in [`similarity`], storage in [`store`],
//! and the HTTP surface in [`api`].

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod similarity;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::similarity::SimilarityEngine;
use crate::store::RiffStore;

/// Uploads larger than this are rejected outright.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RiffStore>,
    pub engine: SimilarityEngine,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<RiffStore>, engine: SimilarityEngine) -> Self {
        Self {
            store,
            engine,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let audio_dir = state.store.audio_dir();

    Router::new()
        .merge(api::riff_routes())
        .merge(api::similarity_routes())
        .merge(api::health_routes())
        .nest_service("/audio_files", ServeDir::new(audio_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
