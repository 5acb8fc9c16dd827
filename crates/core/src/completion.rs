//! Worker completion reports: validation, image format detection and the
//! generation-parameter snapshot stored with the image.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Image format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Detect the format from a filename's extension.
    ///
    /// `jpg`/`jpeg` and `webp` are recognised (case-insensitive); everything
    /// else, including a missing extension, is treated as PNG.
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some("webp") => Self::Webp,
            _ => Self::Png,
        }
    }

    /// Parse a stored format name; unknown values read back as PNG.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "jpeg" => Self::Jpeg,
            "webp" => Self::Webp,
            _ => Self::Png,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Completion report
// ---------------------------------------------------------------------------

/// What a worker sends once an image has been rendered and stored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompletionReport {
    pub filename: String,
    pub original_filename: Option<String>,
    pub file_path: String,
    pub file_size_bytes: Option<i64>,
    pub ftp_path: Option<String>,
    pub gallery_url: Option<String>,
    pub thumbnail_path: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub generation_params: Option<serde_json::Value>,
}

impl CompletionReport {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.filename.trim().is_empty() {
            return Err(CoreError::InvalidReport("filename is required".into()));
        }
        if self.file_path.trim().is_empty() {
            return Err(CoreError::InvalidReport("file_path is required".into()));
        }
        if let Some(w) = self.width {
            if w <= 0 {
                return Err(CoreError::InvalidReport(format!(
                    "width must be positive, got {w}"
                )));
            }
        }
        if let Some(h) = self.height {
            if h <= 0 {
                return Err(CoreError::InvalidReport(format!(
                    "height must be positive, got {h}"
                )));
            }
        }
        if let Some(size) = self.file_size_bytes {
            if size < 0 {
                return Err(CoreError::InvalidReport(format!(
                    "file_size_bytes must not be negative, got {size}"
                )));
            }
        }
        if let Some(params) = &self.generation_params {
            if !params.is_object() {
                return Err(CoreError::InvalidReport(
                    "generation_params must be a JSON object".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn format(&self) -> ImageFormat {
        ImageFormat::from_filename(&self.filename)
    }
}

/// Merge the job-side parameter snapshot with the worker's extras.
///
/// Worker keys win on collision. A non-object `job_params` is replaced by an
/// empty object first so the result is always an object.
pub fn merge_generation_params(
    job_params: serde_json::Value,
    worker_params: Option<&serde_json::Value>,
) -> serde_json::Value {
    let mut merged = match job_params {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    if let Some(serde_json::Value::Object(extra)) = worker_params {
        for (k, v) in extra {
            merged.insert(k.clone(), v.clone());
        }
    }
    serde_json::Value::Object(merged)
}
