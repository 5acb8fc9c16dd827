//! Write-side lifecycle operations: claim, fail, cancel and retry.
//!
//! Each operation validates against the job as read, then persists with a
//! status-conditional update. When the update misses, someone else changed
//! the job in between.

use promptforge_core::error::CoreError;
use promptforge_core::lifecycle::{JobLifecycle, JobStatus};
use promptforge_core::types::DbId;
use promptforge_db::models::job::Job;

use crate::service::ImageQueue;
use crate::store::JobChange;

/// Conditional writes attempted per transition before giving up.
const MAX_WRITE_ATTEMPTS: usize = 3;

impl ImageQueue {
    /// Claim a pending job for rendering.
    ///
    /// Of two concurrent claims exactly one succeeds; the other gets
    /// [`CoreError::TransientConflict`] and should re-poll.
    pub async fn mark_processing(&self, job_id: DbId) -> Result<Job, CoreError> {
        let job = self.get_job(job_id).await?;
        let current = job.lifecycle()?;
        let now = self.now();
        let next = current.mark_processing(now)?;

        let change = JobChange {
            job_id,
            expected: current.status,
            next,
            message: None,
            at: now,
        };
        match self.store.transition(change).await? {
            Some(job) => {
                tracing::info!(
                    job_id,
                    prompt_id = %job.prompt_id,
                    attempt = job.attempts,
                    "Job claimed",
                );
                Ok(job)
            }
            None => {
                tracing::warn!(job_id, "Lost claim race");
                Err(CoreError::TransientConflict { job_id })
            }
        }
    }

    /// Record a render failure reported by the worker.
    pub async fn fail(&self, job_id: DbId, message: &str) -> Result<Job, CoreError> {
        let now = self.now();
        let job = self
            .transition(job_id, JobStatus::Failed, Some(message.to_string()), |lc| {
                lc.mark_failed(message, now)
            })
            .await?;
        tracing::info!(
            job_id,
            attempts = job.attempts,
            max_attempts = job.max_attempts,
            error = message,
            "Job failed",
        );
        Ok(job)
    }

    /// Cancel a pending or processing job. A render already in flight is not
    /// interrupted; its eventual report will be rejected.
    pub async fn cancel(&self, job_id: DbId) -> Result<Job, CoreError> {
        let now = self.now();
        let job = self
            .transition(job_id, JobStatus::Cancelled, None, |lc| lc.mark_cancelled(now))
            .await?;
        tracing::info!(job_id, "Job cancelled");
        Ok(job)
    }

    /// Operator retry of a failed job that still has attempts left.
    pub async fn retry(&self, job_id: DbId) -> Result<Job, CoreError> {
        let job = self
            .transition(job_id, JobStatus::Pending, Some("retry".into()), |lc| lc.retry())
            .await?;
        tracing::info!(
            job_id,
            attempts = job.attempts,
            max_attempts = job.max_attempts,
            "Job requeued",
        );
        Ok(job)
    }

    /// Apply a status change named by string, as sent over the wire.
    ///
    /// `pending` means retry. `completed` is refused: completion goes
    /// through [`ImageQueue::complete`] so the image is recorded with it.
    pub async fn apply_status(
        &self,
        job_id: DbId,
        status: &str,
        error_message: Option<String>,
    ) -> Result<Job, CoreError> {
        match status.parse::<JobStatus>()? {
            JobStatus::Processing => self.mark_processing(job_id).await,
            JobStatus::Failed => {
                let message = error_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string());
                self.fail(job_id, &message).await
            }
            JobStatus::Cancelled => self.cancel(job_id).await,
            JobStatus::Pending => self.retry(job_id).await,
            JobStatus::Completed => Err(CoreError::InvalidRequest(
                "Jobs are completed by submitting a completion report".into(),
            )),
        }
    }

    /// Shared path for transitions other than the claim.
    ///
    /// A missed conditional update means the job changed underneath us: the
    /// job is read again and the step re-validated against what is stored.
    /// If the step is still legal the write is retried, a bounded number of
    /// times.
    async fn transition<F>(
        &self,
        job_id: DbId,
        target: JobStatus,
        message: Option<String>,
        step: F,
    ) -> Result<Job, CoreError>
    where
        F: Fn(&JobLifecycle) -> Result<JobLifecycle, CoreError>,
    {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self.get_job(job_id).await?.lifecycle()?;
            let next = step(&current)?;

            let change = JobChange {
                job_id,
                expected: current.status,
                next,
                message: message.clone(),
                at: self.now(),
            };
            if let Some(updated) = self.store.transition(change).await? {
                return Ok(updated);
            }
            tracing::warn!(
                job_id,
                expected = %current.status,
                target = %target,
                "Job changed concurrently",
            );
        }
        Err(CoreError::TransientConflict { job_id })
    }
}
