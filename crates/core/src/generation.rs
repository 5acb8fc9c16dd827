//! Generator categories, rendering parameter defaults and admission
//! validation rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Generator category
// ---------------------------------------------------------------------------

/// Which prompt generator produced the job's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorCategory {
    Anime,
    Alien,
    Adventurer,
}

impl GeneratorCategory {
    pub const ALL: [GeneratorCategory; 3] = [
        GeneratorCategory::Anime,
        GeneratorCategory::Alien,
        GeneratorCategory::Adventurer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Alien => "alien",
            Self::Adventurer => "adventurer",
        }
    }
}

impl fmt::Display for GeneratorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                CoreError::InvalidRequest(format!(
                    "Invalid generator type '{s}'. Must be one of: anime, alien, adventurer"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Limits and defaults
// ---------------------------------------------------------------------------

pub const MIN_DIMENSION: i32 = 256;
pub const MAX_DIMENSION: i32 = 4096;
pub const DEFAULT_DIMENSION: i32 = 1024;

pub const MIN_STEPS: i32 = 1;
pub const MAX_STEPS: i32 = 100;
pub const DEFAULT_STEPS: i32 = 30;

pub const MIN_CFG_SCALE: f64 = 1.0;
pub const MAX_CFG_SCALE: f64 = 20.0;
pub const DEFAULT_CFG_SCALE: f64 = 7.0;

pub const DEFAULT_MODEL: &str = "sd_xl_base_1.0";
pub const DEFAULT_SAMPLER: &str = "euler";
pub const DEFAULT_SCHEDULER: &str = "normal";

/// Attempts a job gets before an operator retry is refused.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;
/// Upper bound accepted for `max_attempts` on submission.
pub const MAX_ATTEMPTS_LIMIT: i32 = 10;

// ---------------------------------------------------------------------------
// Rendering parameters
// ---------------------------------------------------------------------------

/// The fixed set of knobs handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderParams {
    pub width: i32,
    pub height: i32,
    pub steps: i32,
    pub cfg_scale: f64,
    pub seed: Option<i64>,
    pub model: String,
    pub sampler: String,
    pub scheduler: String,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            steps: DEFAULT_STEPS,
            cfg_scale: DEFAULT_CFG_SCALE,
            seed: None,
            model: DEFAULT_MODEL.to_string(),
            sampler: DEFAULT_SAMPLER.to_string(),
            scheduler: DEFAULT_SCHEDULER.to_string(),
        }
    }
}

impl RenderParams {
    /// Check every field against its admitted range.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_dimension(self.width, "Width")?;
        validate_dimension(self.height, "Height")?;
        validate_steps(self.steps)?;
        validate_cfg_scale(self.cfg_scale)?;
        validate_name(&self.model, "Model")?;
        validate_name(&self.sampler, "Sampler")?;
        validate_name(&self.scheduler, "Scheduler")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

pub fn validate_dimension(value: i32, name: &str) -> Result<(), CoreError> {
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        return Err(CoreError::InvalidRequest(format!(
            "{name} must be between {MIN_DIMENSION} and {MAX_DIMENSION}"
        )));
    }
    Ok(())
}

pub fn validate_steps(value: i32) -> Result<(), CoreError> {
    if !(MIN_STEPS..=MAX_STEPS).contains(&value) {
        return Err(CoreError::InvalidRequest(format!(
            "Steps must be between {MIN_STEPS} and {MAX_STEPS}"
        )));
    }
    Ok(())
}

pub fn validate_cfg_scale(value: f64) -> Result<(), CoreError> {
    // NaN fails `contains`, which is what we want.
    if !(MIN_CFG_SCALE..=MAX_CFG_SCALE).contains(&value) {
        return Err(CoreError::InvalidRequest(format!(
            "CFG scale must be between {MIN_CFG_SCALE:.1} and {MAX_CFG_SCALE:.1}"
        )));
    }
    Ok(())
}

pub fn validate_max_attempts(value: i32) -> Result<(), CoreError> {
    if !(1..=MAX_ATTEMPTS_LIMIT).contains(&value) {
        return Err(CoreError::InvalidRequest(format!(
            "Max attempts must be between 1 and {MAX_ATTEMPTS_LIMIT}"
        )));
    }
    Ok(())
}

pub fn validate_prompt_text(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::InvalidRequest(
            "Prompt text must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_name(value: &str, name: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidRequest(format!(
            "{name} name must not be empty"
        )));
    }
    Ok(())
}
