//! Handlers for the `/images` resource.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use promptforge_core::types::DbId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/images/{id}
///
/// Returns the image record and counts the view. Inactive images are 404.
pub async fn get_image(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(image_id) = path?;
    let image = state.queue.view_image(image_id).await?;
    Ok(Json(DataResponse { data: image }))
}

/// POST /api/v1/images/{id}/download
///
/// Counts a download and returns where the file is stored.
pub async fn download_image(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(image_id) = path?;
    let download = state.queue.download_image(image_id).await?;
    Ok(Json(DataResponse { data: download }))
}
