use crate::lifecycle::JobStatus;
use crate::types::DbId;

/// Every failure the queue can report.
///
/// Callers match on the variant to decide whether to fix the request,
/// re-poll, or escalate; nothing in the queue surfaces an untyped error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed or out-of-range submission; the job was never created.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Entity not found: {entity} with id {key}")]
    NotFound { entity: &'static str, key: String },

    /// The job's current status does not permit the requested change.
    /// The job is left untouched.
    #[error("Illegal transition: {from} -> {to} ({reason})")]
    IllegalTransition {
        from: JobStatus,
        to: JobStatus,
        reason: String,
    },

    /// A worker's completion report is missing fields or carries bad values.
    #[error("Invalid report: {0}")]
    InvalidReport(String),

    /// Another worker claimed the job first. Re-poll; not a user-facing failure.
    #[error("Job {job_id} was claimed concurrently")]
    TransientConflict { job_id: DbId },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// `NotFound` for a job addressed by its store id.
    pub fn job_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "Job",
            key: id.to_string(),
        }
    }

    /// `NotFound` for an image addressed by its store id.
    pub fn image_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "Image",
            key: id.to_string(),
        }
    }
}
