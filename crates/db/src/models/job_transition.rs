//! Audit log of job status changes.

use promptforge_core::lifecycle::{JobStatus, StatusId};
use promptforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `job_transitions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobTransition {
    pub id: DbId,
    pub job_id: DbId,
    pub from_status_id: StatusId,
    pub to_status_id: StatusId,
    pub message: Option<String>,
    pub occurred_at: Timestamp,
}

/// Values for appending to the transition log.
#[derive(Debug, Clone)]
pub struct NewJobTransition {
    pub job_id: DbId,
    pub from: JobStatus,
    pub to: JobStatus,
    pub message: Option<String>,
    pub occurred_at: Timestamp,
}

impl NewJobTransition {
    pub fn into_transition(self, id: DbId) -> JobTransition {
        JobTransition {
            id,
            job_id: self.job_id,
            from_status_id: self.from.id(),
            to_status_id: self.to.id(),
            message: self.message,
            occurred_at: self.occurred_at,
        }
    }
}
