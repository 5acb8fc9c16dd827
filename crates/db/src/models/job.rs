//! Job entity model and insert DTO.

use promptforge_core::error::CoreError;
use promptforge_core::generation::{GeneratorCategory, RenderParams};
use promptforge_core::lifecycle::{JobLifecycle, JobStatus, StatusId};
use promptforge_core::scheduling::QueueKey;
use promptforge_core::types::{DbId, PromptId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub prompt_id: PromptId,
    pub generator_type: String,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub width: i32,
    pub height: i32,
    pub steps: i32,
    pub cfg_scale: f64,
    pub seed: Option<i64>,
    pub model: String,
    pub sampler: String,
    pub scheduler: String,
    pub priority: i32,
    pub session_id: Option<String>,
    pub original_prompt_data: Option<serde_json::Value>,
    pub status_id: StatusId,
    pub attempts: i32,
    pub max_attempts: i32,
    pub processing_started_at: Option<Timestamp>,
    pub processing_completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Decode `status_id`. An id outside the seeded lookup table means the
    /// row was written by something other than this crate.
    pub fn status(&self) -> Result<JobStatus, CoreError> {
        JobStatus::from_id(self.status_id).ok_or_else(|| {
            CoreError::Storage(format!(
                "job {} has unknown status_id {}",
                self.id, self.status_id
            ))
        })
    }

    pub fn category(&self) -> Result<GeneratorCategory, CoreError> {
        self.generator_type
            .parse()
            .map_err(|_| {
                CoreError::Storage(format!(
                    "job {} has unknown generator_type '{}'",
                    self.id, self.generator_type
                ))
            })
    }

    /// The status/attempt bookkeeping the state machine operates on.
    pub fn lifecycle(&self) -> Result<JobLifecycle, CoreError> {
        Ok(JobLifecycle {
            status: self.status()?,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            processing_started_at: self.processing_started_at,
            processing_completed_at: self.processing_completed_at,
            error_message: self.error_message.clone(),
        })
    }

    /// Copy a persisted lifecycle back onto the row.
    pub fn apply_lifecycle(&mut self, lifecycle: &JobLifecycle, now: Timestamp) {
        self.status_id = lifecycle.status.id();
        self.attempts = lifecycle.attempts;
        self.max_attempts = lifecycle.max_attempts;
        self.processing_started_at = lifecycle.processing_started_at;
        self.processing_completed_at = lifecycle.processing_completed_at;
        self.error_message = lifecycle.error_message.clone();
        self.updated_at = now;
    }

    pub fn render_params(&self) -> RenderParams {
        RenderParams {
            width: self.width,
            height: self.height,
            steps: self.steps,
            cfg_scale: self.cfg_scale,
            seed: self.seed,
            model: self.model.clone(),
            sampler: self.sampler.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    pub fn queue_key(&self) -> QueueKey {
        QueueKey {
            priority: self.priority,
            created_at: self.created_at,
            id: self.id,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status_id == JobStatus::Pending.id()
    }
}

/// Values for inserting a new pending job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub prompt_id: PromptId,
    pub generator_type: GeneratorCategory,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub params: RenderParams,
    pub priority: i32,
    pub session_id: Option<String>,
    pub original_prompt_data: Option<serde_json::Value>,
    pub max_attempts: i32,
    pub created_at: Timestamp,
}

impl NewJob {
    /// Build the row a store would return for this insert.
    pub fn into_job(self, id: DbId) -> Job {
        let lifecycle = JobLifecycle::new_pending(self.max_attempts);
        Job {
            id,
            prompt_id: self.prompt_id,
            generator_type: self.generator_type.as_str().to_string(),
            prompt_text: self.prompt_text,
            negative_prompt: self.negative_prompt,
            width: self.params.width,
            height: self.params.height,
            steps: self.params.steps,
            cfg_scale: self.params.cfg_scale,
            seed: self.params.seed,
            model: self.params.model,
            sampler: self.params.sampler,
            scheduler: self.params.scheduler,
            priority: self.priority,
            session_id: self.session_id,
            original_prompt_data: self.original_prompt_data,
            status_id: lifecycle.status.id(),
            attempts: lifecycle.attempts,
            max_attempts: lifecycle.max_attempts,
            processing_started_at: None,
            processing_completed_at: None,
            error_message: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
