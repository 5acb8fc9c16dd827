//! Repository for the `jobs` table.
//!
//! Status changes go through [`JobRepo::apply_transition`], a single
//! `UPDATE ... WHERE status_id = <expected>`: whichever caller's update lands
//! first wins, and every other caller gets `None` back.

use promptforge_core::lifecycle::{JobLifecycle, JobStatus, StatusId};
use promptforge_core::types::{DbId, PromptId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::job::{Job, NewJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, prompt_id, generator_type, prompt_text, negative_prompt, \
    width, height, steps, cfg_scale, seed, model, sampler, scheduler, \
    priority, session_id, original_prompt_data, \
    status_id, attempts, max_attempts, \
    processing_started_at, processing_completed_at, error_message, \
    created_at, updated_at";

/// Pending order shared by every listing that feeds a worker.
const PENDING_ORDER: &str = "ORDER BY priority DESC, created_at ASC, id ASC";

/// Provides queue operations over persisted jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job.
    pub async fn insert(pool: &PgPool, input: &NewJob) -> Result<Job, sqlx::Error> {
        let lifecycle = JobLifecycle::new_pending(input.max_attempts);
        let query = format!(
            "INSERT INTO jobs \
                 (prompt_id, generator_type, prompt_text, negative_prompt, \
                  width, height, steps, cfg_scale, seed, model, sampler, scheduler, \
                  priority, session_id, original_prompt_data, \
                  status_id, attempts, max_attempts, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                     $13, $14, $15, $16, $17, $18, $19, $19) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.prompt_id)
            .bind(input.generator_type.as_str())
            .bind(&input.prompt_text)
            .bind(&input.negative_prompt)
            .bind(input.params.width)
            .bind(input.params.height)
            .bind(input.params.steps)
            .bind(input.params.cfg_scale)
            .bind(input.params.seed)
            .bind(&input.params.model)
            .bind(&input.params.sampler)
            .bind(&input.params.scheduler)
            .bind(input.priority)
            .bind(&input.session_id)
            .bind(&input.original_prompt_data)
            .bind(lifecycle.status.id())
            .bind(lifecycle.attempts)
            .bind(lifecycle.max_attempts)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by its external prompt id.
    pub async fn find_by_prompt_id(
        pool: &PgPool,
        prompt_id: PromptId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE prompt_id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(prompt_id)
            .fetch_optional(pool)
            .await
    }

    /// Pending jobs in dispatch order, optionally limited to one generator type.
    pub async fn list_pending(
        pool: &PgPool,
        generator_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id = $1 AND ($2::TEXT IS NULL OR generator_type = $2) \
             {PENDING_ORDER} \
             LIMIT $3"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Pending.id())
            .bind(generator_type)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Number of pending jobs that sort strictly before the given queue key.
    pub async fn count_pending_ahead(
        pool: &PgPool,
        priority: i32,
        created_at: Timestamp,
        id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs \
             WHERE status_id = $1 \
               AND (priority > $2 \
                    OR (priority = $2 AND created_at < $3) \
                    OR (priority = $2 AND created_at = $3 AND id < $4))",
        )
        .bind(JobStatus::Pending.id())
        .bind(priority)
        .bind(created_at)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// All jobs submitted under a session, newest first.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE session_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Mean processing time in seconds over completed jobs, optionally for
    /// one generator type. `None` when there is no history.
    pub async fn average_processing_secs(
        pool: &PgPool,
        generator_type: Option<&str>,
    ) -> Result<Option<f64>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(EXTRACT(EPOCH FROM (processing_completed_at - processing_started_at)))::FLOAT8 \
             FROM jobs \
             WHERE status_id = $1 \
               AND ($2::TEXT IS NULL OR generator_type = $2) \
               AND processing_started_at IS NOT NULL \
               AND processing_completed_at >= processing_started_at",
        )
        .bind(JobStatus::Completed.id())
        .bind(generator_type)
        .fetch_one(pool)
        .await
    }

    /// Job counts grouped by status id.
    pub async fn status_counts(pool: &PgPool) -> Result<Vec<(StatusId, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (StatusId, i64)>(
            "SELECT status_id, COUNT(*) FROM jobs GROUP BY status_id ORDER BY status_id",
        )
        .fetch_all(pool)
        .await
    }

    /// Persist `next` only if the stored status still equals `expected`.
    ///
    /// Returns the updated row, or `None` when the row is missing or another
    /// writer changed its status first.
    pub async fn apply_transition(
        conn: &mut PgConnection,
        id: DbId,
        expected: JobStatus,
        next: &JobLifecycle,
        now: Timestamp,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $3, attempts = $4, max_attempts = $5, \
                 processing_started_at = $6, processing_completed_at = $7, \
                 error_message = $8, updated_at = $9 \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(expected.id())
            .bind(next.status.id())
            .bind(next.attempts)
            .bind(next.max_attempts)
            .bind(next.processing_started_at)
            .bind(next.processing_completed_at)
            .bind(&next.error_message)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await
    }
}
