//! Queue admission: validate a generation request and persist it as a
//! pending job.

use promptforge_core::error::CoreError;
use promptforge_core::generation::{
    validate_max_attempts, validate_prompt_text, GeneratorCategory, RenderParams,
    DEFAULT_MAX_ATTEMPTS,
};
use promptforge_core::lifecycle::JobStatus;
use promptforge_core::scheduling::{validate_priority, PRIORITY_NORMAL};
use promptforge_core::types::{PromptId, Timestamp};
use promptforge_db::models::job::NewJob;
use serde::Deserialize;

use crate::service::ImageQueue;
use crate::views::SubmittedJob;

/// A client's generation request. Only `generator_type` and `prompt_text`
/// are required; everything else falls back to the render defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitJobRequest {
    pub generator_type: String,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub steps: Option<i32>,
    pub cfg_scale: Option<f64>,
    pub seed: Option<i64>,
    pub model: Option<String>,
    pub sampler: Option<String>,
    pub scheduler: Option<String>,
    pub priority: Option<i32>,
    pub session_id: Option<String>,
    pub original_prompt_data: Option<serde_json::Value>,
    pub max_attempts: Option<i32>,
}

impl SubmitJobRequest {
    /// Validate every field and build the insert. Nothing is persisted here.
    pub fn into_new_job(self, prompt_id: PromptId, now: Timestamp) -> Result<NewJob, CoreError> {
        let generator_type: GeneratorCategory = self.generator_type.parse()?;
        validate_prompt_text(&self.prompt_text)?;

        let defaults = RenderParams::default();
        let params = RenderParams {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            steps: self.steps.unwrap_or(defaults.steps),
            cfg_scale: self.cfg_scale.unwrap_or(defaults.cfg_scale),
            seed: self.seed,
            model: self.model.unwrap_or(defaults.model),
            sampler: self.sampler.unwrap_or(defaults.sampler),
            scheduler: self.scheduler.unwrap_or(defaults.scheduler),
        };
        params.validate()?;

        let priority = self.priority.unwrap_or(PRIORITY_NORMAL);
        validate_priority(priority)?;

        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        validate_max_attempts(max_attempts)?;

        Ok(NewJob {
            prompt_id,
            generator_type,
            prompt_text: self.prompt_text.trim().to_string(),
            negative_prompt: self
                .negative_prompt
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            params,
            priority,
            session_id: self.session_id.filter(|s| !s.trim().is_empty()),
            original_prompt_data: self.original_prompt_data,
            max_attempts,
            created_at: now,
        })
    }
}

impl ImageQueue {
    /// Admit a generation request as a new pending job.
    pub async fn submit(&self, request: SubmitJobRequest) -> Result<SubmittedJob, CoreError> {
        let now = self.now();
        let new_job = request.into_new_job(uuid::Uuid::new_v4(), now)?;
        let job = self.store.insert_job(new_job).await?;

        let queue_position = self.position_of(&job).await?;
        let estimated_completion = self.estimated_completion(&job).await?;

        tracing::info!(
            job_id = job.id,
            prompt_id = %job.prompt_id,
            generator_type = %job.generator_type,
            priority = job.priority,
            queue_position,
            "Job submitted",
        );

        Ok(SubmittedJob {
            prompt_id: job.prompt_id,
            queue_id: job.id,
            queue_position,
            estimated_completion,
            status: JobStatus::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::QueueConfig;
    use crate::memory::MemoryJobStore;
    use crate::store::JobStore;

    fn start() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()
    }

    fn queue() -> (ImageQueue, Arc<MemoryJobStore>) {
        let store = Arc::new(MemoryJobStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let q = ImageQueue::new(store.clone(), clock, QueueConfig::default());
        (q, store)
    }

    fn request(priority: Option<i32>) -> SubmitJobRequest {
        SubmitJobRequest {
            generator_type: "anime".into(),
            prompt_text: "a fox spirit under lanterns".into(),
            priority,
            ..SubmitJobRequest::default()
        }
    }

    #[tokio::test]
    async fn submit_into_empty_queue_is_first() {
        let (q, store) = queue();
        let submitted = q
            .submit(SubmitJobRequest {
                width: Some(1024),
                height: Some(1024),
                ..request(Some(5))
            })
            .await
            .unwrap();

        assert_eq!(submitted.status, JobStatus::Pending);
        assert_eq!(submitted.queue_position, Some(1));
        assert_eq!(
            submitted.estimated_completion,
            Some(start() + Duration::seconds(300))
        );

        let job = store.find_job(submitted.queue_id).await.unwrap().unwrap();
        assert_eq!(job.attempts, 0);
        assert_eq!(job.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(job.priority, 5);
        assert_eq!(job.prompt_id, submitted.prompt_id);
        assert_eq!(job.created_at, start());
    }

    #[tokio::test]
    async fn width_out_of_range_persists_nothing() {
        let (q, store) = queue();
        let err = q
            .submit(SubmitJobRequest {
                width: Some(100),
                ..request(None)
            })
            .await
            .unwrap_err();
        assert_matches!(
            err,
            CoreError::InvalidRequest(msg) if msg == "Width must be between 256 and 4096"
        );
        assert!(store.list_pending(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_category_rejected() {
        let (q, _) = queue();
        let err = q
            .submit(SubmitJobRequest {
                generator_type: "cyberpunk".into(),
                ..request(None)
            })
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::InvalidRequest(_));
    }

    #[test]
    fn each_out_of_range_field_is_rejected() {
        let cases = [
            SubmitJobRequest { prompt_text: " ".into(), ..request(None) },
            SubmitJobRequest { height: Some(5000), ..request(None) },
            SubmitJobRequest { steps: Some(0), ..request(None) },
            SubmitJobRequest { cfg_scale: Some(25.0), ..request(None) },
            SubmitJobRequest { max_attempts: Some(0), ..request(None) },
            request(Some(11)),
        ];
        for case in cases {
            assert_matches!(
                case.into_new_job(uuid::Uuid::new_v4(), start()),
                Err(CoreError::InvalidRequest(_))
            );
        }
    }

    #[test]
    fn defaults_fill_omitted_fields() {
        let job = request(None)
            .into_new_job(uuid::Uuid::new_v4(), start())
            .unwrap();
        assert_eq!(job.params, RenderParams::default());
        assert_eq!(job.priority, PRIORITY_NORMAL);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.negative_prompt, None);
    }

    #[tokio::test]
    async fn prompt_ids_are_distinct() {
        let (q, _) = queue();
        let a = q.submit(request(None)).await.unwrap();
        let b = q.submit(request(None)).await.unwrap();
        assert_ne!(a.prompt_id, b.prompt_id);
        assert_ne!(a.queue_id, b.queue_id);
    }
}
