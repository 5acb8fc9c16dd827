use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/sessions/{session_id}/jobs
///
/// Status views for every job submitted under a session, newest first.
/// An unknown session yields an empty list.
pub async fn list_session_jobs(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.queue.session_jobs(&session_id).await?;
    Ok(Json(DataResponse { data: jobs }))
}
