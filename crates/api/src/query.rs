//! Query parameter types for API handlers.

use serde::Deserialize;

/// `GET /jobs/pending?generator_type=&limit=`.
///
/// `limit` is clamped by the queue; `generator_type` is parsed in the
/// handler so an unknown category maps to `INVALID_REQUEST`.
#[derive(Debug, Default, Deserialize)]
pub struct PendingJobsParams {
    pub generator_type: Option<String>,
    pub limit: Option<i64>,
}
