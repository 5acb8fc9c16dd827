//! Repository for the `job_transitions` audit log.

use promptforge_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::job_transition::{JobTransition, NewJobTransition};

const COLUMNS: &str = "id, job_id, from_status_id, to_status_id, message, occurred_at";

pub struct JobTransitionRepo;

impl JobTransitionRepo {
    /// Append one entry. Runs on the caller's connection so it commits with
    /// the job update it describes.
    pub async fn record(
        conn: &mut PgConnection,
        input: &NewJobTransition,
    ) -> Result<JobTransition, sqlx::Error> {
        let query = format!(
            "INSERT INTO job_transitions \
                 (job_id, from_status_id, to_status_id, message, occurred_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobTransition>(&query)
            .bind(input.job_id)
            .bind(input.from.id())
            .bind(input.to.id())
            .bind(&input.message)
            .bind(input.occurred_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Full history for a job, oldest first.
    pub async fn list_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<JobTransition>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_transitions WHERE job_id = $1 \
             ORDER BY occurred_at ASC, id ASC"
        );
        sqlx::query_as::<_, JobTransition>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
