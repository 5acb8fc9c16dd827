//! Repository for the `images` table.

use promptforge_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::image::{Image, NewImage};

const COLUMNS: &str = "\
    id, job_id, prompt_id, generator_type, filename, original_filename, \
    file_path, ftp_path, gallery_url, thumbnail_path, file_size_bytes, \
    width, height, format, generation_params, \
    is_active, is_public, is_featured, view_count, download_count, \
    created_at, updated_at";

pub struct ImageRepo;

impl ImageRepo {
    /// Insert an image. `uq_images_job_id` rejects a second image for the
    /// same job.
    pub async fn create(conn: &mut PgConnection, input: &NewImage) -> Result<Image, sqlx::Error> {
        let query = format!(
            "INSERT INTO images \
                 (job_id, prompt_id, generator_type, filename, original_filename, \
                  file_path, ftp_path, gallery_url, thumbnail_path, file_size_bytes, \
                  width, height, format, generation_params, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(input.job_id)
            .bind(input.prompt_id)
            .bind(&input.generator_type)
            .bind(&input.filename)
            .bind(&input.original_filename)
            .bind(&input.file_path)
            .bind(&input.ftp_path)
            .bind(&input.gallery_url)
            .bind(&input.thumbnail_path)
            .bind(input.file_size_bytes)
            .bind(input.width)
            .bind(input.height)
            .bind(input.format.as_str())
            .bind(&input.generation_params)
            .bind(input.created_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Bump `view_count` on an active image and return the updated row.
    pub async fn increment_views(
        pool: &PgPool,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!(
            "UPDATE images SET view_count = view_count + 1, updated_at = $2 \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Bump `download_count` on an active image and return the updated row.
    pub async fn increment_downloads(
        pool: &PgPool,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!(
            "UPDATE images SET download_count = download_count + 1, updated_at = $2 \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(pool)
            .await
    }
}
