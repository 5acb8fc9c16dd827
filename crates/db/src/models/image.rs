//! Gallery image produced by a completed job.

use promptforge_core::completion::ImageFormat;
use promptforge_core::types::{DbId, PromptId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    /// Nullable so the image survives a later purge of its job.
    pub job_id: Option<DbId>,
    pub prompt_id: PromptId,
    pub generator_type: String,
    pub filename: String,
    pub original_filename: Option<String>,
    pub file_path: String,
    pub ftp_path: Option<String>,
    pub gallery_url: Option<String>,
    pub thumbnail_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub width: i32,
    pub height: i32,
    pub format: String,
    pub generation_params: serde_json::Value,
    pub is_active: bool,
    pub is_public: bool,
    pub is_featured: bool,
    pub view_count: i64,
    pub download_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Image {
    pub fn image_format(&self) -> ImageFormat {
        ImageFormat::from_stored(&self.format)
    }
}

/// Values for inserting a new image.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub job_id: DbId,
    pub prompt_id: PromptId,
    pub generator_type: String,
    pub filename: String,
    pub original_filename: Option<String>,
    pub file_path: String,
    pub ftp_path: Option<String>,
    pub gallery_url: Option<String>,
    pub thumbnail_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub width: i32,
    pub height: i32,
    pub format: ImageFormat,
    pub generation_params: serde_json::Value,
    pub created_at: Timestamp,
}

impl NewImage {
    /// Build the row a store would return for this insert, with the
    /// gallery defaults (active, public, not featured, zero counters).
    pub fn into_image(self, id: DbId) -> Image {
        Image {
            id,
            job_id: Some(self.job_id),
            prompt_id: self.prompt_id,
            generator_type: self.generator_type,
            filename: self.filename,
            original_filename: self.original_filename,
            file_path: self.file_path,
            ftp_path: self.ftp_path,
            gallery_url: self.gallery_url,
            thumbnail_path: self.thumbnail_path,
            file_size_bytes: self.file_size_bytes,
            width: self.width,
            height: self.height,
            format: self.format.as_str().to_string(),
            generation_params: self.generation_params,
            is_active: true,
            is_public: true,
            is_featured: false,
            view_count: 0,
            download_count: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
