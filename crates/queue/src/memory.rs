//! In-process [`JobStore`] for tests and database-less local runs.
//!
//! All state sits behind one `tokio::sync::Mutex`; each trait method holds
//! the lock for its whole body, which gives conditional updates the same
//! compare-and-set behaviour as the PostgreSQL store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use promptforge_core::generation::GeneratorCategory;
use promptforge_core::lifecycle::JobStatus;
use promptforge_core::scheduling::{position_among, QueueKey};
use promptforge_core::types::{DbId, PromptId, Timestamp};
use promptforge_db::models::image::{Image, NewImage};
use promptforge_db::models::job::{Job, NewJob};
use promptforge_db::models::job_transition::JobTransition;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{JobChange, JobStore};

#[derive(Debug, Default)]
struct State {
    jobs: BTreeMap<DbId, Job>,
    images: BTreeMap<DbId, Image>,
    transitions: Vec<JobTransition>,
    next_job_id: DbId,
    next_image_id: DbId,
    next_transition_id: DbId,
    fail_image_inserts: bool,
}

impl State {
    fn next_id(counter: &mut DbId) -> DbId {
        *counter += 1;
        *counter
    }

    /// Conditional update shared by `transition` and `complete_with_image`.
    fn apply(&mut self, change: &JobChange) -> Option<Job> {
        let job = self.jobs.get_mut(&change.job_id)?;
        if job.status_id != change.expected.id() {
            return None;
        }
        job.apply_lifecycle(&change.next, change.at);
        let updated = job.clone();

        let id = Self::next_id(&mut self.next_transition_id);
        self.transitions.push(change.log_entry().into_transition(id));
        Some(updated)
    }
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: Mutex<State>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent image insert fail with `Unavailable`, to
    /// exercise the "image first, then job" ordering of completion.
    pub async fn set_image_insert_failure(&self, fail: bool) {
        self.state.lock().await.fail_image_inserts = fail;
    }

    pub async fn image_count(&self) -> usize {
        self.state.lock().await.images.len()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_job(&self, job: NewJob) -> Result<Job, StoreError> {
        let mut state = self.state.lock().await;
        if state.jobs.values().any(|j| j.prompt_id == job.prompt_id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate prompt_id {}",
                job.prompt_id
            )));
        }
        let id = State::next_id(&mut state.next_job_id);
        let row = job.into_job(id);
        state.jobs.insert(id, row.clone());
        Ok(row)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn find_job_by_prompt_id(&self, prompt_id: PromptId) -> Result<Option<Job>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .values()
            .find(|j| j.prompt_id == prompt_id)
            .cloned())
    }

    async fn list_pending(
        &self,
        category: Option<GeneratorCategory>,
        limit: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let state = self.state.lock().await;
        let mut pending: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.is_pending())
            .filter(|j| category.map_or(true, |c| j.generator_type == c.as_str()))
            .cloned()
            .collect();
        pending.sort_by_key(Job::queue_key);
        pending.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(pending)
    }

    async fn count_pending_ahead(&self, key: QueueKey) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let pending: Vec<QueueKey> = state
            .jobs
            .values()
            .filter(|j| j.is_pending())
            .map(Job::queue_key)
            .collect();
        Ok(position_among(&key, &pending) - 1)
    }

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<Job>, StoreError> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn average_processing_secs(
        &self,
        category: Option<GeneratorCategory>,
    ) -> Result<Option<f64>, StoreError> {
        let state = self.state.lock().await;
        let durations: Vec<f64> = state
            .jobs
            .values()
            .filter(|j| j.status_id == JobStatus::Completed.id())
            .filter(|j| category.map_or(true, |c| j.generator_type == c.as_str()))
            .filter_map(|j| match (j.processing_started_at, j.processing_completed_at) {
                (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
                _ => None,
            })
            .collect();
        Ok(promptforge_core::estimation::average_duration_secs(&durations))
    }

    async fn status_counts(&self) -> Result<Vec<(JobStatus, i64)>, StoreError> {
        let state = self.state.lock().await;
        let mut counts: BTreeMap<i16, i64> = BTreeMap::new();
        for job in state.jobs.values() {
            *counts.entry(job.status_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .filter_map(|(id, n)| JobStatus::from_id(id).map(|s| (s, n)))
            .collect())
    }

    async fn transition(&self, change: JobChange) -> Result<Option<Job>, StoreError> {
        Ok(self.state.lock().await.apply(&change))
    }

    async fn complete_with_image(
        &self,
        image: NewImage,
        change: JobChange,
    ) -> Result<Option<(Job, Image)>, StoreError> {
        let mut state = self.state.lock().await;

        if state.fail_image_inserts {
            return Err(StoreError::Unavailable("image insert failed".into()));
        }
        if state
            .images
            .values()
            .any(|i| i.job_id == Some(image.job_id))
        {
            return Ok(None);
        }

        // The lock is held throughout, so the image insert below cannot fail
        // after the job update has been applied.
        let Some(job) = state.apply(&change) else {
            return Ok(None);
        };
        let image_id = State::next_id(&mut state.next_image_id);
        let created = image.into_image(image_id);
        state.images.insert(image_id, created.clone());
        Ok(Some((job, created)))
    }

    async fn list_transitions(&self, job_id: DbId) -> Result<Vec<JobTransition>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .transitions
            .iter()
            .filter(|t| t.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn record_image_view(&self, id: DbId, at: Timestamp) -> Result<Option<Image>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.images.get_mut(&id).filter(|i| i.is_active).map(|image| {
            image.view_count += 1;
            image.updated_at = at;
            image.clone()
        }))
    }

    async fn record_image_download(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Image>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.images.get_mut(&id).filter(|i| i.is_active).map(|image| {
            image.download_count += 1;
            image.updated_at = at;
            image.clone()
        }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
