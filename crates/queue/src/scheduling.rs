//! Read-side queue operations: pending listings, position, ETA and the
//! status views built from them.

use std::collections::HashMap;

use promptforge_core::error::CoreError;
use promptforge_core::estimation::estimate_completion;
use promptforge_core::generation::GeneratorCategory;
use promptforge_core::types::{DbId, PromptId, Timestamp};
use promptforge_db::models::job::Job;
use promptforge_db::models::job_transition::JobTransition;

use crate::service::ImageQueue;
use crate::views::{JobStatusView, PendingJobView, QueueStats};

impl ImageQueue {
    /// Pending jobs in dispatch order, optionally for one category.
    pub async fn list_pending(
        &self,
        category: Option<GeneratorCategory>,
        limit: Option<i64>,
    ) -> Result<Vec<PendingJobView>, CoreError> {
        let limit = self.config.clamp_limit(limit);
        let jobs = self.store.list_pending(category, limit).await?;
        Ok(jobs.iter().map(PendingJobView::from).collect())
    }

    /// 1-based position among all pending jobs; `None` unless pending.
    pub async fn position_of(&self, job: &Job) -> Result<Option<i64>, CoreError> {
        if !job.is_pending() {
            return Ok(None);
        }
        let ahead = self.store.count_pending_ahead(job.queue_key()).await?;
        Ok(Some(ahead + 1))
    }

    /// ETA for a pending job; `None` unless pending.
    pub async fn estimated_completion(&self, job: &Job) -> Result<Option<Timestamp>, CoreError> {
        let Some(position) = self.position_of(job).await? else {
            return Ok(None);
        };
        let avg = self
            .store
            .average_processing_secs(Some(job.category()?))
            .await?;
        Ok(Some(self.eta(avg, position)))
    }

    fn eta(&self, avg: Option<f64>, position: i64) -> Timestamp {
        estimate_completion(
            self.now(),
            avg,
            self.config.default_processing_secs,
            position,
        )
    }

    pub async fn get_job_by_prompt_id(&self, prompt_id: PromptId) -> Result<Job, CoreError> {
        self.store
            .find_job_by_prompt_id(prompt_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Job",
                key: prompt_id.to_string(),
            })
    }

    pub async fn job_status(&self, job_id: DbId) -> Result<JobStatusView, CoreError> {
        let job = self.get_job(job_id).await?;
        self.status_view(&job, &mut HashMap::new()).await
    }

    pub async fn job_status_by_prompt_id(
        &self,
        prompt_id: PromptId,
    ) -> Result<JobStatusView, CoreError> {
        let job = self.get_job_by_prompt_id(prompt_id).await?;
        self.status_view(&job, &mut HashMap::new()).await
    }

    /// Status views for every job of a session, newest first.
    pub async fn session_jobs(&self, session_id: &str) -> Result<Vec<JobStatusView>, CoreError> {
        let jobs = self.store.list_by_session(session_id).await?;
        let mut averages = HashMap::new();
        let mut views = Vec::with_capacity(jobs.len());
        for job in &jobs {
            views.push(self.status_view(job, &mut averages).await?);
        }
        Ok(views)
    }

    /// Build a status view. `averages` caches the per-category mean so a
    /// session listing queries it once per category.
    async fn status_view(
        &self,
        job: &Job,
        averages: &mut HashMap<GeneratorCategory, Option<f64>>,
    ) -> Result<JobStatusView, CoreError> {
        let lifecycle = job.lifecycle()?;
        let queue_position = self.position_of(job).await?;

        let estimated_completion = match queue_position {
            Some(position) => {
                let category = job.category()?;
                let avg = match averages.get(&category) {
                    Some(avg) => *avg,
                    None => {
                        let avg = self.store.average_processing_secs(Some(category)).await?;
                        averages.insert(category, avg);
                        avg
                    }
                };
                Some(self.eta(avg, position))
            }
            None => None,
        };

        let processing_duration = if lifecycle.status.is_finished() {
            lifecycle.processing_duration_secs()
        } else {
            None
        };

        Ok(JobStatusView {
            id: job.id,
            prompt_id: job.prompt_id,
            generator_type: job.generator_type.clone(),
            status: lifecycle.status,
            queue_position,
            estimated_completion,
            processing_duration,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }

    /// Per-status counts plus the overall mean processing time.
    pub async fn queue_stats(&self) -> Result<QueueStats, CoreError> {
        let counts = self.store.status_counts().await?;
        let avg = self.store.average_processing_secs(None).await?;
        Ok(QueueStats::from_counts(&counts, avg))
    }

    /// Transition log of a job, oldest first.
    pub async fn list_transitions(&self, job_id: DbId) -> Result<Vec<JobTransition>, CoreError> {
        self.get_job(job_id).await?;
        Ok(self.store.list_transitions(job_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use promptforge_core::completion::CompletionReport;

    use super::*;
    use crate::admission::SubmitJobRequest;
    use crate::clock::{Clock, ManualClock};
    use crate::config::QueueConfig;
    use crate::memory::MemoryJobStore;

    fn start() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap()
    }

    fn queue() -> (ImageQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let q = ImageQueue::new(
            Arc::new(MemoryJobStore::new()),
            clock.clone(),
            QueueConfig::default(),
        );
        (q, clock)
    }

    fn request(category: &str, priority: i32, session: Option<&str>) -> SubmitJobRequest {
        SubmitJobRequest {
            generator_type: category.into(),
            prompt_text: "a lighthouse in a storm".into(),
            priority: Some(priority),
            session_id: session.map(str::to_string),
            ..SubmitJobRequest::default()
        }
    }

    fn report() -> CompletionReport {
        CompletionReport {
            filename: "render.png".into(),
            file_path: "/srv/images/render.png".into(),
            ..CompletionReport::default()
        }
    }

    #[tokio::test]
    async fn pending_order_is_priority_then_age() {
        let (q, clock) = queue();
        let low = q.submit(request("anime", 0, None)).await.unwrap();
        clock.advance(Duration::seconds(1));
        let high = q.submit(request("alien", 5, None)).await.unwrap();
        clock.advance(Duration::seconds(1));
        let low_later = q.submit(request("anime", 0, None)).await.unwrap();

        let ids: Vec<DbId> = q
            .list_pending(None, None)
            .await
            .unwrap()
            .iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![high.queue_id, low.queue_id, low_later.queue_id]);
    }

    #[tokio::test]
    async fn same_timestamp_breaks_ties_by_id() {
        let (q, _) = queue();
        let a = q.submit(request("anime", 0, None)).await.unwrap();
        let b = q.submit(request("anime", 0, None)).await.unwrap();
        let listed = q.list_pending(None, None).await.unwrap();
        assert_eq!(listed[0].id, a.queue_id);
        assert_eq!(listed[1].id, b.queue_id);
    }

    #[tokio::test]
    async fn category_filter_and_limit() {
        let (q, _) = queue();
        for _ in 0..3 {
            q.submit(request("anime", 0, None)).await.unwrap();
        }
        q.submit(request("alien", 0, None)).await.unwrap();

        let aliens = q
            .list_pending(Some(GeneratorCategory::Alien), None)
            .await
            .unwrap();
        assert_eq!(aliens.len(), 1);
        assert_eq!(aliens[0].generator_type, "alien");

        assert_eq!(q.list_pending(None, Some(2)).await.unwrap().len(), 2);
        assert_eq!(q.list_pending(None, Some(0)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn higher_priority_submission_moves_others_back() {
        let (q, _) = queue();
        let first = q.submit(request("anime", 0, None)).await.unwrap();
        assert_eq!(q.job_status(first.queue_id).await.unwrap().queue_position, Some(1));

        let urgent = q.submit(request("anime", 10, None)).await.unwrap();
        assert_eq!(urgent.queue_position, Some(1));
        assert_eq!(q.job_status(first.queue_id).await.unwrap().queue_position, Some(2));

        // Equal priority, later submission: nobody moves.
        let trailing = q.submit(request("anime", 0, None)).await.unwrap();
        assert_eq!(trailing.queue_position, Some(3));
        assert_eq!(q.job_status(first.queue_id).await.unwrap().queue_position, Some(2));
    }

    #[tokio::test]
    async fn position_does_not_increase_as_jobs_ahead_leave() {
        let (q, _) = queue();
        let a = q.submit(request("anime", 0, None)).await.unwrap();
        let b = q.submit(request("anime", 0, None)).await.unwrap();
        let c = q.submit(request("anime", 0, None)).await.unwrap();
        assert_eq!(c.queue_position, Some(3));

        q.mark_processing(a.queue_id).await.unwrap();
        assert_eq!(q.job_status(c.queue_id).await.unwrap().queue_position, Some(2));
        q.cancel(b.queue_id).await.unwrap();
        assert_eq!(q.job_status(c.queue_id).await.unwrap().queue_position, Some(1));
    }

    #[tokio::test]
    async fn non_pending_jobs_have_no_position_or_eta() {
        let (q, _) = queue();
        let a = q.submit(request("anime", 0, None)).await.unwrap();
        q.mark_processing(a.queue_id).await.unwrap();
        let view = q.job_status(a.queue_id).await.unwrap();
        assert_eq!(view.queue_position, None);
        assert_eq!(view.estimated_completion, None);
        assert_eq!(view.processing_duration, None);
    }

    #[tokio::test]
    async fn eta_uses_category_history() {
        let (q, clock) = queue();
        // Two finished anime renders of 60s and 120s.
        for secs in [60, 120] {
            let job = q.submit(request("anime", 0, None)).await.unwrap();
            q.mark_processing(job.queue_id).await.unwrap();
            clock.advance(Duration::seconds(secs));
            q.complete(job.queue_id, report())
                .await
                .unwrap();
        }

        q.submit(request("anime", 0, None)).await.unwrap();
        let second = q.submit(request("anime", 0, None)).await.unwrap();
        let now = clock.now();
        assert_eq!(second.queue_position, Some(2));
        assert_eq!(second.estimated_completion, Some(now + Duration::seconds(180)));

        // No alien history: fallback of 300s per job, position 3.
        let alien = q.submit(request("alien", 0, None)).await.unwrap();
        assert_eq!(alien.estimated_completion, Some(now + Duration::seconds(900)));
    }

    #[tokio::test]
    async fn session_jobs_newest_first_with_views() {
        let (q, clock) = queue();
        let older = q.submit(request("anime", 0, Some("s-1"))).await.unwrap();
        clock.advance(Duration::seconds(5));
        let newer = q.submit(request("alien", 0, Some("s-1"))).await.unwrap();
        q.submit(request("anime", 0, Some("s-2"))).await.unwrap();

        q.mark_processing(older.queue_id).await.unwrap();
        clock.advance(Duration::seconds(30));
        q.fail(older.queue_id, "out of memory").await.unwrap();

        let views = q.session_jobs("s-1").await.unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, newer.queue_id);
        assert_eq!(views[0].queue_position, Some(1));
        assert_eq!(views[1].id, older.queue_id);
        assert_eq!(views[1].error_message.as_deref(), Some("out of memory"));
        assert_eq!(views[1].processing_duration, Some(30.0));

        assert!(q.session_jobs("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_count_each_status() {
        let (q, _) = queue();
        let a = q.submit(request("anime", 0, None)).await.unwrap();
        let b = q.submit(request("anime", 0, None)).await.unwrap();
        q.submit(request("anime", 0, None)).await.unwrap();
        q.mark_processing(a.queue_id).await.unwrap();
        q.cancel(b.queue_id).await.unwrap();

        let stats = q.queue_stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.average_processing_secs, None);
    }

    #[tokio::test]
    async fn lookup_by_prompt_id() {
        let (q, _) = queue();
        let submitted = q.submit(request("adventurer", 0, None)).await.unwrap();
        let view = q.job_status_by_prompt_id(submitted.prompt_id).await.unwrap();
        assert_eq!(view.id, submitted.queue_id);

        let missing = q.job_status_by_prompt_id(uuid::Uuid::new_v4()).await;
        assert!(matches!(missing, Err(CoreError::NotFound { .. })));
    }
}
