//! Similarity query handler

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    error::{ApiError, ApiResult},
    models::SimilarRiff,
    AppState,
};

const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Deserialize)]
pub struct SimilarityQuery {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// GET /similarity/:id?top_k=N
///
/// The `top_k` most acoustically similar riffs to `id`, closest first.
pub async fn similar_riffs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SimilarityQuery>,
) -> ApiResult<Json<Vec<SimilarRiff>>> {
    if query.top_k < 1 {
        return Err(ApiError::BadRequest("top_k must be at least 1".to_string()));
    }

    let neighbors = state
        .engine
        .find_similar(state.store.as_ref(), &id, query.top_k)
        .await?;

    let mut results = Vec::with_capacity(neighbors.len());
    for neighbor in neighbors {
        // A riff deleted mid-query simply drops out of the response.
        match state.store.get(&neighbor.id).await {
            Some(riff) => results.push(SimilarRiff {
                riff,
                distance: neighbor.distance,
            }),
            None => warn!(riff_id = %neighbor.id, "ranked riff vanished before response"),
        }
    }

    Ok(Json(results))
}

pub fn similarity_routes() -> Router<AppState> {
    Router::new().route("/similarity/:id", get(similar_riffs))
}
