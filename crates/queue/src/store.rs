//! The persistence seam of the queue.
//!
//! [`JobStore`] is what the service layer talks to. Two implementations
//! ship: [`crate::pg::PgJobStore`] over PostgreSQL and
//! [`crate::memory::MemoryJobStore`] for tests and local development. Both
//! must give the same guarantee for [`JobStore::transition`] and
//! [`JobStore::complete_with_image`]: the write happens only if the stored
//! status still equals [`JobChange::expected`].

use async_trait::async_trait;
use promptforge_core::generation::GeneratorCategory;
use promptforge_core::lifecycle::{JobLifecycle, JobStatus};
use promptforge_core::scheduling::QueueKey;
use promptforge_core::types::{DbId, PromptId, Timestamp};
use promptforge_db::models::image::{Image, NewImage};
use promptforge_db::models::job::{Job, NewJob};
use promptforge_db::models::job_transition::{JobTransition, NewJobTransition};

use crate::error::StoreError;

/// A status change to persist with compare-and-set semantics.
#[derive(Debug, Clone)]
pub struct JobChange {
    pub job_id: DbId,
    /// Status the row must still have for the write to apply.
    pub expected: JobStatus,
    pub next: JobLifecycle,
    /// Optional note stored in the transition log.
    pub message: Option<String>,
    pub at: Timestamp,
}

impl JobChange {
    pub fn log_entry(&self) -> NewJobTransition {
        NewJobTransition {
            job_id: self.job_id,
            from: self.expected,
            to: self.next.status,
            message: self.message.clone(),
            occurred_at: self.at,
        }
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: NewJob) -> Result<Job, StoreError>;

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    async fn find_job_by_prompt_id(&self, prompt_id: PromptId) -> Result<Option<Job>, StoreError>;

    /// Pending jobs ordered by priority desc, created_at asc, id asc.
    async fn list_pending(
        &self,
        category: Option<GeneratorCategory>,
        limit: i64,
    ) -> Result<Vec<Job>, StoreError>;

    /// Pending jobs that sort strictly before `key`.
    async fn count_pending_ahead(&self, key: QueueKey) -> Result<i64, StoreError>;

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<Job>, StoreError>;

    /// Mean processing seconds over completed jobs (of one category, or all).
    async fn average_processing_secs(
        &self,
        category: Option<GeneratorCategory>,
    ) -> Result<Option<f64>, StoreError>;

    async fn status_counts(&self) -> Result<Vec<(JobStatus, i64)>, StoreError>;

    /// Apply `change` and log it, atomically. `None` if the job is missing
    /// or its status no longer equals `change.expected`.
    async fn transition(&self, change: JobChange) -> Result<Option<Job>, StoreError>;

    /// Insert `image`, then apply `change`, as one unit of work.
    ///
    /// If the image insert fails nothing is written. If the conditional job
    /// update misses (or the job already owns an image) the insert is undone
    /// and `None` is returned.
    async fn complete_with_image(
        &self,
        image: NewImage,
        change: JobChange,
    ) -> Result<Option<(Job, Image)>, StoreError>;

    async fn list_transitions(&self, job_id: DbId) -> Result<Vec<JobTransition>, StoreError>;

    async fn record_image_view(&self, id: DbId, at: Timestamp) -> Result<Option<Image>, StoreError>;

    async fn record_image_download(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Image>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
