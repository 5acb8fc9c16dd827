//! Completion reconciliation: turn a worker's report into an image record
//! and a completed job, as one unit of work.

use promptforge_core::completion::{merge_generation_params, CompletionReport};
use promptforge_core::error::CoreError;
use promptforge_core::lifecycle::JobStatus;
use promptforge_core::types::{DbId, Timestamp};
use promptforge_db::models::image::{Image, NewImage};
use promptforge_db::models::job::Job;
use serde_json::json;

use crate::service::ImageQueue;
use crate::store::JobChange;
use crate::views::{CompletedImage, ImageDownload};

/// Prompt and render settings the job was submitted with.
fn job_params_snapshot(job: &Job) -> serde_json::Value {
    json!({
        "prompt": job.prompt_text,
        "negative_prompt": job.negative_prompt,
        "generator_type": job.generator_type,
        "width": job.width,
        "height": job.height,
        "steps": job.steps,
        "cfg_scale": job.cfg_scale,
        "seed": job.seed,
        "model": job.model,
        "sampler": job.sampler,
        "scheduler": job.scheduler,
    })
}

fn new_image(job: &Job, report: CompletionReport, now: Timestamp) -> NewImage {
    let format = report.format();
    let generation_params =
        merge_generation_params(job_params_snapshot(job), report.generation_params.as_ref());
    NewImage {
        job_id: job.id,
        prompt_id: job.prompt_id,
        generator_type: job.generator_type.clone(),
        filename: report.filename,
        original_filename: report.original_filename,
        file_path: report.file_path,
        ftp_path: report.ftp_path,
        gallery_url: report.gallery_url,
        thumbnail_path: report.thumbnail_path,
        file_size_bytes: report.file_size_bytes,
        width: report.width.unwrap_or(job.width),
        height: report.height.unwrap_or(job.height),
        format,
        generation_params,
        created_at: now,
    }
}

impl ImageQueue {
    /// Record a finished render: create its image and mark the job completed.
    ///
    /// The job must be `processing`. A second report for the same job, or a
    /// report for a job cancelled meanwhile, is an `IllegalTransition` and
    /// creates nothing.
    pub async fn complete(
        &self,
        job_id: DbId,
        report: CompletionReport,
    ) -> Result<CompletedImage, CoreError> {
        let job = self.get_job(job_id).await?;
        report.validate()?;

        let current = job.lifecycle()?;
        let now = self.now();
        let next = match current.mark_completed(now) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!(job_id, status = %current.status, "Rejected stale completion report");
                return Err(e);
            }
        };

        let image = new_image(&job, report, now);
        let change = JobChange {
            job_id,
            expected: current.status,
            next,
            message: None,
            at: now,
        };

        let Some((job, image)) = self.store.complete_with_image(image, change).await? else {
            let fresh = self.get_job(job_id).await?.lifecycle()?;
            tracing::warn!(job_id, status = %fresh.status, "Completion lost to a concurrent change");
            if fresh.status == JobStatus::Processing {
                return Err(CoreError::TransientConflict { job_id });
            }
            return Err(CoreError::IllegalTransition {
                from: fresh.status,
                to: JobStatus::Completed,
                reason: "job was modified concurrently".into(),
            });
        };

        tracing::info!(
            job_id,
            image_id = image.id,
            prompt_id = %job.prompt_id,
            format = %image.image_format(),
            "Job completed",
        );
        Ok(self.completed_image(image))
    }

    fn completed_image(&self, image: Image) -> CompletedImage {
        let base = &self.config.public_base_url;
        CompletedImage {
            image_id: image.id,
            job_id: image.job_id.unwrap_or_default(),
            prompt_id: image.prompt_id,
            format: image.image_format(),
            view_url: format!("{base}/api/v1/images/{}", image.id),
            download_url: format!("{base}/api/v1/images/{}/download", image.id),
            image,
        }
    }

    /// Fetch an image for display, counting the view.
    pub async fn view_image(&self, image_id: DbId) -> Result<Image, CoreError> {
        self.store
            .record_image_view(image_id, self.now())
            .await?
            .ok_or_else(|| CoreError::image_not_found(image_id))
    }

    /// Count a download and return where the file lives.
    pub async fn download_image(&self, image_id: DbId) -> Result<ImageDownload, CoreError> {
        let image = self
            .store
            .record_image_download(image_id, self.now())
            .await?
            .ok_or_else(|| CoreError::image_not_found(image_id))?;
        tracing::debug!(image_id, downloads = image.download_count, "Image download recorded");
        Ok(ImageDownload::from(&image))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use promptforge_core::completion::ImageFormat;
    use serde_json::json;

    use super::*;
    use crate::admission::SubmitJobRequest;
    use crate::clock::ManualClock;
    use crate::config::QueueConfig;
    use crate::memory::MemoryJobStore;

    fn start() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 4, 4, 15, 0, 0).unwrap()
    }

    struct Fixture {
        queue: ImageQueue,
        store: Arc<MemoryJobStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryJobStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let config = QueueConfig {
            public_base_url: "https://gallery.example".into(),
            ..QueueConfig::default()
        };
        Fixture {
            queue: ImageQueue::new(store.clone(), clock.clone(), config),
            store,
            clock,
        }
    }

    fn report(filename: &str) -> CompletionReport {
        CompletionReport {
            filename: filename.into(),
            file_path: format!("/srv/images/{filename}"),
            ..CompletionReport::default()
        }
    }

    async fn claimed_job(q: &ImageQueue) -> DbId {
        let id = q
            .submit(SubmitJobRequest {
                generator_type: "alien".into(),
                prompt_text: "bioluminescent reef city".into(),
                width: Some(768),
                height: Some(512),
                seed: Some(42),
                ..SubmitJobRequest::default()
            })
            .await
            .unwrap()
            .queue_id;
        q.mark_processing(id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn completion_creates_image_and_finishes_job() {
        let f = fixture();
        let id = claimed_job(&f.queue).await;
        f.clock.advance(Duration::seconds(45));

        let done = f
            .queue
            .complete(
                id,
                CompletionReport {
                    width: Some(1536),
                    generation_params: Some(json!({"seed": 7, "vae": "sdxl_vae"})),
                    ..report("reef.JPG")
                },
            )
            .await
            .unwrap();

        assert_eq!(done.format, ImageFormat::Jpeg);
        assert_eq!(done.image.width, 1536);
        assert_eq!(done.image.height, 512);
        assert_eq!(done.image.generation_params["seed"], 7);
        assert_eq!(done.image.generation_params["vae"], "sdxl_vae");
        assert_eq!(done.image.generation_params["prompt"], "bioluminescent reef city");
        assert!(done.image.is_active && done.image.is_public && !done.image.is_featured);
        assert_eq!(
            done.view_url,
            format!("https://gallery.example/api/v1/images/{}", done.image_id)
        );
        assert_eq!(
            done.download_url,
            format!("https://gallery.example/api/v1/images/{}/download", done.image_id)
        );

        let job = f.queue.get_job(id).await.unwrap();
        assert_eq!(job.status().unwrap(), JobStatus::Completed);
        assert_eq!(job.lifecycle().unwrap().processing_duration_secs(), Some(45.0));
    }

    #[tokio::test]
    async fn second_report_is_rejected_without_duplicate_image() {
        let f = fixture();
        let id = claimed_job(&f.queue).await;
        f.queue.complete(id, report("a.png")).await.unwrap();

        assert_matches!(
            f.queue.complete(id, report("a.png")).await,
            Err(CoreError::IllegalTransition { from: JobStatus::Completed, .. })
        );
        assert_eq!(f.store.image_count().await, 1);
    }

    #[tokio::test]
    async fn report_after_cancel_is_stale() {
        let f = fixture();
        let id = claimed_job(&f.queue).await;
        f.queue.cancel(id).await.unwrap();

        assert_matches!(
            f.queue.complete(id, report("late.webp")).await,
            Err(CoreError::IllegalTransition { from: JobStatus::Cancelled, .. })
        );
        assert_eq!(f.store.image_count().await, 0);
    }

    #[tokio::test]
    async fn failed_image_insert_leaves_job_processing() {
        let f = fixture();
        let id = claimed_job(&f.queue).await;
        f.store.set_image_insert_failure(true).await;

        assert_matches!(
            f.queue.complete(id, report("a.png")).await,
            Err(CoreError::Storage(_))
        );
        let job = f.queue.get_job(id).await.unwrap();
        assert_eq!(job.status().unwrap(), JobStatus::Processing);

        f.store.set_image_insert_failure(false).await;
        assert!(f.queue.complete(id, report("a.png")).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_report_is_checked_before_status() {
        let f = fixture();
        let id = claimed_job(&f.queue).await;
        assert_matches!(
            f.queue.complete(id, report("")).await,
            Err(CoreError::InvalidReport(_))
        );
        assert_matches!(
            f.queue.complete(999, report("a.png")).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn pending_job_cannot_complete() {
        let f = fixture();
        let id = f
            .queue
            .submit(SubmitJobRequest {
                generator_type: "anime".into(),
                prompt_text: "cat cafe".into(),
                ..SubmitJobRequest::default()
            })
            .await
            .unwrap()
            .queue_id;
        assert_matches!(
            f.queue.complete(id, report("a.png")).await,
            Err(CoreError::IllegalTransition { from: JobStatus::Pending, .. })
        );
    }

    #[tokio::test]
    async fn views_and_downloads_are_counted() {
        let f = fixture();
        let id = claimed_job(&f.queue).await;
        let done = f.queue.complete(id, report("a.webp")).await.unwrap();

        f.queue.view_image(done.image_id).await.unwrap();
        let viewed = f.queue.view_image(done.image_id).await.unwrap();
        assert_eq!(viewed.view_count, 2);

        let download = f.queue.download_image(done.image_id).await.unwrap();
        assert_eq!(download.download_count, 1);
        assert_eq!(download.mime_type, "image/webp");
        assert_eq!(download.file_path, "/srv/images/a.webp");

        assert_matches!(f.queue.view_image(12345).await, Err(CoreError::NotFound { .. }));
    }
}
