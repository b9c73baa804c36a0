use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::services::{allowed_extension, store_upload, StoredPhoto, UploadItem};
use crate::{error::AppError, state::AppState};

pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload-photo", post(upload_photo))
        .route("/delete-photo/:filename", delete(delete_photo))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /upload-photo
/// Fields: `photo` (the file) and optional `studentId`.
#[instrument(skip(state, mp))]
pub async fn upload_photo(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<StoredPhoto>, AppError> {
    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut student_id = None;

    while let Some(field) = mp.next_field().await? {
        match field.name() {
            Some("photo") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await?;
                file = Some((file_name, body));
            }
            Some("studentId") => student_id = Some(field.text().await?),
            _ => {}
        }
    }

    let Some((file_name, body)) = file else {
        return Err(AppError::validation("No file in request"));
    };
    if file_name.is_empty() {
        return Err(AppError::validation("No file selected"));
    }
    let Some(ext) = allowed_extension(&file_name) else {
        warn!(%file_name, "rejected upload with unsupported extension");
        return Err(AppError::validation("Unsupported file format"));
    };

    let stored = store_upload(
        &*state.photos,
        UploadItem {
            file_name,
            body,
            student_id,
        },
        &ext,
    )
    .await?;
    Ok(Json(stored))
}

#[instrument(skip(state))]
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.photos.delete_object(&filename).await? {
        return Err(AppError::not_found("File not found"));
    }
    info!(%filename, "photo deleted");
    Ok(Json(json!({ "success": true, "message": "Photo deleted" })))
}
