//! Payloads the queue hands back to clients, workers and operators.

use promptforge_core::completion::ImageFormat;
use promptforge_core::generation::RenderParams;
use promptforge_core::lifecycle::JobStatus;
use promptforge_core::types::{DbId, PromptId, Timestamp};
use promptforge_db::models::image::Image;
use promptforge_db::models::job::Job;
use serde::Serialize;

/// Result of a successful submission. Position and ETA are advisory.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedJob {
    pub prompt_id: PromptId,
    pub queue_id: DbId,
    pub queue_position: Option<i64>,
    pub estimated_completion: Option<Timestamp>,
    pub status: JobStatus,
}

/// What a polling worker needs to render a job.
#[derive(Debug, Clone, Serialize)]
pub struct PendingJobView {
    pub id: DbId,
    pub prompt_id: PromptId,
    pub generator_type: String,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub parameters: RenderParams,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: Timestamp,
}

impl From<&Job> for PendingJobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            prompt_id: job.prompt_id,
            generator_type: job.generator_type.clone(),
            prompt_text: job.prompt_text.clone(),
            negative_prompt: job.negative_prompt.clone(),
            parameters: job.render_params(),
            priority: job.priority,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            created_at: job.created_at,
        }
    }
}

/// Client-facing status of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub id: DbId,
    pub prompt_id: PromptId,
    pub generator_type: String,
    pub status: JobStatus,
    /// Only set while pending.
    pub queue_position: Option<i64>,
    /// Only set while pending.
    pub estimated_completion: Option<Timestamp>,
    /// Seconds from start to finish, once finished.
    pub processing_duration: Option<f64>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The image created by a completion, plus URLs derived from its id.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedImage {
    pub image_id: DbId,
    pub job_id: DbId,
    pub prompt_id: PromptId,
    pub format: ImageFormat,
    pub view_url: String,
    pub download_url: String,
    pub image: Image,
}

/// Location details returned when an image download is recorded.
#[derive(Debug, Clone, Serialize)]
pub struct ImageDownload {
    pub image_id: DbId,
    pub filename: String,
    pub file_path: String,
    pub ftp_path: Option<String>,
    pub mime_type: &'static str,
    pub download_count: i64,
}

impl From<&Image> for ImageDownload {
    fn from(image: &Image) -> Self {
        Self {
            image_id: image.id,
            filename: image.filename.clone(),
            file_path: image.file_path.clone(),
            ftp_path: image.ftp_path.clone(),
            mime_type: image.image_format().mime_type(),
            download_count: image.download_count,
        }
    }
}

/// Operator snapshot of the queue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
    pub average_processing_secs: Option<f64>,
}

impl QueueStats {
    pub fn from_counts(counts: &[(JobStatus, i64)], average_processing_secs: Option<f64>) -> Self {
        let mut stats = Self {
            average_processing_secs,
            ..Self::default()
        };
        for (status, n) in counts {
            let slot = match status {
                JobStatus::Pending => &mut stats.pending,
                JobStatus::Processing => &mut stats.processing,
                JobStatus::Completed => &mut stats.completed,
                JobStatus::Failed => &mut stats.failed,
                JobStatus::Cancelled => &mut stats.cancelled,
            };
            *slot += n;
        }
        stats
    }
}
