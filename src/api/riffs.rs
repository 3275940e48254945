//! Riff catalog CRUD handlers

use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::Riff,
    AppState,
};

/// GET /riffs
///
/// All riffs, newest first.
pub async fn list_riffs(State(state): State<AppState>) -> Json<Vec<Riff>> {
    Json(state.store.list().await)
}

/// POST /riffs
///
/// Multipart form: `name`, `date`, `file`. The upload is analyzed once to
/// record its duration and prime the fingerprint cache; analysis failure is
/// logged and leaves duration at 0.0, and the riff is stored regardless.
pub async fn create_riff(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Riff>> {
    let mut name: Option<String> = None;
    let mut date: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => {
                name = Some(field.text().await.map_err(bad_field)?);
            }
            Some("date") => {
                date = Some(field.text().await.map_err(bad_field)?);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("riff.webm").to_string();
                let bytes = field.bytes().await.map_err(bad_field)?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ApiError::BadRequest("missing field: name".to_string()))?;
    let date = date.ok_or_else(|| ApiError::BadRequest("missing field: date".to_string()))?;
    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("missing field: file".to_string()))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }

    let riff_id = Uuid::new_v4().to_string();

    let duration = match state.engine.analyze(&riff_id, bytes.clone()).await {
        Ok(analysis) => analysis.duration,
        Err(e) => {
            warn!(riff_id = %riff_id, error = %e, "upload analysis failed; storing without duration");
            0.0
        }
    };

    let riff = state
        .store
        .add(riff_id, name, date, &filename, &bytes, duration)
        .await?;

    info!(riff_id = %riff.id, name = %riff.name, "riff created");
    Ok(Json(riff))
}

/// DELETE /riffs/:id
pub async fn delete_riff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.store.delete(&id).await?;
    state.engine.invalidate(&id).await;

    Ok(Json(json!({ "message": "riff deleted" })))
}

fn bad_field(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart field: {e}"))
}

pub fn riff_routes() -> Router<AppState> {
    Router::new()
        .route("/riffs", get(list_riffs).post(create_riff))
        .route("/riffs/:id", delete(delete_riff))
}
