use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/queue
///
/// Per-status job counts and the mean processing time of completed jobs.
pub async fn get_queue_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = state.queue.queue_stats().await?;
    Ok(Json(DataResponse { data: stats }))
}
