//! End-to-end queue scenarios over the in-memory store.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use promptforge_core::completion::{CompletionReport, ImageFormat};
use promptforge_core::error::CoreError;
use promptforge_core::lifecycle::JobStatus;
use promptforge_queue::admission::SubmitJobRequest;
use promptforge_queue::{ImageQueue, JobStore, ManualClock, MemoryJobStore, QueueConfig};

struct Harness {
    queue: ImageQueue,
    store: Arc<MemoryJobStore>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryJobStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
    ));
    let queue = ImageQueue::new(store.clone(), clock.clone(), QueueConfig::default());
    Harness { queue, store, clock }
}

fn request() -> SubmitJobRequest {
    SubmitJobRequest {
        generator_type: "anime".into(),
        prompt_text: "koi pond in the rain".into(),
        ..SubmitJobRequest::default()
    }
}

#[tokio::test]
async fn submit_into_empty_queue() {
    let h = harness();
    let submitted = h
        .queue
        .submit(SubmitJobRequest {
            priority: Some(5),
            width: Some(1024),
            height: Some(1024),
            ..request()
        })
        .await
        .unwrap();

    assert_eq!(submitted.status, JobStatus::Pending);
    assert_eq!(submitted.queue_position, Some(1));
    let job = h.queue.get_job(submitted.queue_id).await.unwrap();
    assert_eq!(job.attempts, 0);
}

#[tokio::test]
async fn higher_priority_overtakes_earlier_submission() {
    let h = harness();
    let first = h.queue.submit(request()).await.unwrap();
    h.clock.advance(Duration::seconds(30));
    let second = h
        .queue
        .submit(SubmitJobRequest {
            priority: Some(3),
            ..request()
        })
        .await
        .unwrap();

    let pending = h.queue.list_pending(None, None).await.unwrap();
    assert_eq!(pending[0].id, second.queue_id);
    assert_eq!(pending[1].id, first.queue_id);
}

#[tokio::test]
async fn completed_job_cannot_be_claimed() {
    let h = harness();
    let id = h.queue.submit(request()).await.unwrap().queue_id;
    h.queue.mark_processing(id).await.unwrap();
    h.queue
        .complete(
            id,
            CompletionReport {
                filename: "a.png".into(),
                file_path: "/x/a.png".into(),
                ..CompletionReport::default()
            },
        )
        .await
        .unwrap();
    let before = h.queue.get_job(id).await.unwrap();

    assert_matches!(
        h.queue.mark_processing(id).await,
        Err(CoreError::IllegalTransition { from: JobStatus::Completed, to: JobStatus::Processing, .. })
    );
    let after = h.queue.get_job(id).await.unwrap();
    assert_eq!(after.status_id, before.status_id);
    assert_eq!(after.attempts, before.attempts);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn completing_a_processing_job() {
    let h = harness();
    let id = h.queue.submit(request()).await.unwrap().queue_id;
    h.queue.mark_processing(id).await.unwrap();

    let done = h
        .queue
        .complete(
            id,
            CompletionReport {
                filename: "a.png".into(),
                file_path: "/x/a.png".into(),
                ..CompletionReport::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(done.format, ImageFormat::Png);
    assert_eq!(done.image.job_id, Some(id));
    assert_eq!(
        h.queue.get_job(id).await.unwrap().status().unwrap(),
        JobStatus::Completed
    );
}

#[tokio::test]
async fn undersized_width_is_rejected_and_not_persisted() {
    let h = harness();
    let err = h
        .queue
        .submit(SubmitJobRequest {
            width: Some(100),
            ..request()
        })
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::InvalidRequest(ref m) if m == "Width must be between 256 and 4096");
    assert!(h.store.list_pending(None, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn three_failures_exhaust_the_job() {
    let h = harness();
    let id = h
        .queue
        .submit(SubmitJobRequest {
            max_attempts: Some(3),
            ..request()
        })
        .await
        .unwrap()
        .queue_id;

    for attempt in 1..=3 {
        h.queue.mark_processing(id).await.unwrap();
        h.queue.fail(id, &format!("attempt {attempt} failed")).await.unwrap();
        if attempt < 3 {
            h.queue.retry(id).await.unwrap();
        }
    }

    let job = h.queue.get_job(id).await.unwrap();
    assert_eq!(job.status().unwrap(), JobStatus::Failed);
    assert_eq!(job.attempts, 3);

    let err = h.queue.retry(id).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::IllegalTransition { ref reason, .. } if reason.contains("attempts (3) >= max_attempts (3)")
    );
}

#[tokio::test]
async fn attempts_never_exceed_cap_under_repeated_claims() {
    let h = harness();
    let id = h
        .queue
        .submit(SubmitJobRequest {
            max_attempts: Some(2),
            ..request()
        })
        .await
        .unwrap()
        .queue_id;

    for _ in 0..5 {
        let _ = h.queue.mark_processing(id).await;
        let _ = h.queue.fail(id, "boom").await;
        let _ = h.queue.retry(id).await;
    }
    let job = h.queue.get_job(id).await.unwrap();
    assert!(job.attempts <= job.max_attempts);
    assert_eq!(job.status().unwrap(), JobStatus::Failed);
}
