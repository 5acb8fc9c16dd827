//! PostgreSQL-backed [`JobStore`].

use async_trait::async_trait;
use promptforge_core::generation::GeneratorCategory;
use promptforge_core::lifecycle::JobStatus;
use promptforge_core::scheduling::QueueKey;
use promptforge_core::types::{DbId, PromptId, Timestamp};
use promptforge_db::models::image::{Image, NewImage};
use promptforge_db::models::job::{Job, NewJob};
use promptforge_db::models::job_transition::JobTransition;
use promptforge_db::repositories::{ImageRepo, JobRepo, JobTransitionRepo};
use promptforge_db::DbPool;

use crate::error::StoreError;
use crate::store::{JobChange, JobStore};

/// Unique index that allows at most one image per job.
const IMAGE_PER_JOB_CONSTRAINT: &str = "uq_images_job_id";

#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn is_image_per_job_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(IMAGE_PER_JOB_CONSTRAINT),
        _ => false,
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_job(&self, job: NewJob) -> Result<Job, StoreError> {
        Ok(JobRepo::insert(&self.pool, &job).await?)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_job_by_prompt_id(&self, prompt_id: PromptId) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_prompt_id(&self.pool, prompt_id).await?)
    }

    async fn list_pending(
        &self,
        category: Option<GeneratorCategory>,
        limit: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let generator_type = category.map(GeneratorCategory::as_str);
        Ok(JobRepo::list_pending(&self.pool, generator_type, limit).await?)
    }

    async fn count_pending_ahead(&self, key: QueueKey) -> Result<i64, StoreError> {
        Ok(JobRepo::count_pending_ahead(&self.pool, key.priority, key.created_at, key.id).await?)
    }

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::list_by_session(&self.pool, session_id).await?)
    }

    async fn average_processing_secs(
        &self,
        category: Option<GeneratorCategory>,
    ) -> Result<Option<f64>, StoreError> {
        let generator_type = category.map(GeneratorCategory::as_str);
        Ok(JobRepo::average_processing_secs(&self.pool, generator_type).await?)
    }

    async fn status_counts(&self) -> Result<Vec<(JobStatus, i64)>, StoreError> {
        let rows = JobRepo::status_counts(&self.pool).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, count)| match JobStatus::from_id(id) {
                Some(status) => Some((status, count)),
                None => {
                    tracing::warn!(status_id = id, "Skipping unknown job status in counts");
                    None
                }
            })
            .collect())
    }

    async fn transition(&self, change: JobChange) -> Result<Option<Job>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = JobRepo::apply_transition(
            &mut *tx,
            change.job_id,
            change.expected,
            &change.next,
            change.at,
        )
        .await?;

        let Some(job) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        JobTransitionRepo::record(&mut *tx, &change.log_entry()).await?;
        tx.commit().await?;
        Ok(Some(job))
    }

    async fn complete_with_image(
        &self,
        image: NewImage,
        change: JobChange,
    ) -> Result<Option<(Job, Image)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Image first: if this insert fails the job must stay `processing`.
        let created = match ImageRepo::create(&mut *tx, &image).await {
            Ok(created) => created,
            Err(e) if is_image_per_job_violation(&e) => {
                tx.rollback().await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let updated = JobRepo::apply_transition(
            &mut *tx,
            change.job_id,
            change.expected,
            &change.next,
            change.at,
        )
        .await?;

        let Some(job) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        JobTransitionRepo::record(&mut *tx, &change.log_entry()).await?;
        tx.commit().await?;
        Ok(Some((job, created)))
    }

    async fn list_transitions(&self, job_id: DbId) -> Result<Vec<JobTransition>, StoreError> {
        Ok(JobTransitionRepo::list_for_job(&self.pool, job_id).await?)
    }

    async fn record_image_view(&self, id: DbId, at: Timestamp) -> Result<Option<Image>, StoreError> {
        Ok(ImageRepo::increment_views(&self.pool, id, at).await?)
    }

    async fn record_image_download(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Image>, StoreError> {
        Ok(ImageRepo::increment_downloads(&self.pool, id, at).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(promptforge_db::health_check(&self.pool).await?)
    }
}
