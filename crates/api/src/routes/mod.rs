pub mod health;
pub mod images;
pub mod jobs;
pub mod queue;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                                   submit (POST)
/// /jobs/pending                           pending jobs in dispatch order
/// /jobs/by-prompt/{prompt_id}             status view by external id
/// /jobs/{id}                              status view
/// /jobs/{id}/transitions                  transition log
/// /jobs/{id}/claim                        claim for rendering (POST)
/// /jobs/{id}/status                       status change (PUT)
/// /jobs/{id}/cancel                       cancel (POST)
/// /jobs/{id}/retry                        operator retry (POST)
/// /jobs/{id}/complete                     completion report (POST)
///
/// /sessions/{session_id}/jobs             status views for a session
///
/// /queue                                  queue statistics
///
/// /images/{id}                            image record (counts a view)
/// /images/{id}/download                   record a download (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/sessions", sessions::router())
        .nest("/queue", queue::router())
        .nest("/images", images::router())
}
