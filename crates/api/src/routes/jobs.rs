//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                          -> submit_job
/// GET    /pending                   -> list_pending
/// GET    /by-prompt/{prompt_id}     -> get_job_by_prompt
/// GET    /{id}                      -> get_job
/// GET    /{id}/transitions          -> list_transitions
/// POST   /{id}/claim                -> claim_job
/// PUT    /{id}/status               -> update_status
/// POST   /{id}/cancel               -> cancel_job
/// POST   /{id}/retry                -> retry_job
/// POST   /{id}/complete             -> complete_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::submit_job))
        .route("/pending", get(jobs::list_pending))
        .route("/by-prompt/{prompt_id}", get(jobs::get_job_by_prompt))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/transitions", get(jobs::list_transitions))
        .route("/{id}/claim", post(jobs::claim_job))
        .route("/{id}/status", put(jobs::update_status))
        .route("/{id}/cancel", post(jobs::cancel_job))
        .route("/{id}/retry", post(jobs::retry_job))
        .route("/{id}/complete", post(jobs::complete_job))
}
