//! Handlers for the `/jobs` resource.
//!
//! Clients submit and poll; workers list pending jobs, claim them and report
//! failure or completion; operators cancel and retry.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use promptforge_core::completion::CompletionReport;
use promptforge_core::generation::GeneratorCategory;
use promptforge_core::types::{DbId, PromptId};
use promptforge_queue::admission::SubmitJobRequest;
use serde::Deserialize;

use crate::error::AppResult;
use crate::query::PendingJobsParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for PUT /jobs/{id}/status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Admit a generation request. Returns 201 with the queue id, external
/// prompt id and an advisory position and ETA.
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let submitted = state.queue.submit(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: submitted })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/pending
///
/// Pending jobs in dispatch order. Workers poll this.
pub async fn list_pending(
    State(state): State<AppState>,
    query: Result<Query<PendingJobsParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = query?;
    let category = params
        .generator_type
        .as_deref()
        .map(str::parse::<GeneratorCategory>)
        .transpose()?;
    let jobs = state.queue.list_pending(category, params.limit).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(job_id) = path?;
    let view = state.queue.job_status(job_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/jobs/by-prompt/{prompt_id}
pub async fn get_job_by_prompt(
    State(state): State<AppState>,
    path: Result<Path<PromptId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(prompt_id) = path?;
    let view = state.queue.job_status_by_prompt_id(prompt_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/jobs/{id}/transitions
pub async fn list_transitions(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(job_id) = path?;
    let transitions = state.queue.list_transitions(job_id).await?;
    Ok(Json(DataResponse { data: transitions }))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/claim
///
/// Claim a pending job for rendering. 409 `TRANSIENT_CONFLICT` means
/// another worker won the race; re-poll.
pub async fn claim_job(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(job_id) = path?;
    let job = state.queue.mark_processing(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// PUT /api/v1/jobs/{id}/status
///
/// Generic status change: `processing`, `failed`, `cancelled`, or
/// `pending` (retry).
pub async fn update_status(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(job_id) = path?;
    let Json(input) = payload?;
    let job = state
        .queue
        .apply_status(job_id, &input.status, input.error_message)
        .await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(job_id) = path?;
    let job = state.queue.cancel(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/retry
///
/// Requeue a failed job with attempts left. The attempt count is kept.
pub async fn retry_job(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(job_id) = path?;
    let job = state.queue.retry(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/complete
///
/// Worker completion report. Returns 201 with the created image and its
/// view/download URLs.
pub async fn complete_job(
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
    payload: Result<Json<CompletionReport>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(job_id) = path?;
    let Json(report) = payload?;
    let completed = state.queue.complete(job_id, report).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: completed })))
}
