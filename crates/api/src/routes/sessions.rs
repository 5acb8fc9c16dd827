use axum::routing::get;
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// GET    /{session_id}/jobs         -> list_session_jobs
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{session_id}/jobs", get(sessions::list_session_jobs))
}
