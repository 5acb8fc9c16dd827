use promptforge_core::estimation::DEFAULT_PROCESSING_SECS;

/// Default page size for pending-job listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum page size for pending-job listings.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Upper bound for `DEFAULT_PROCESSING_SECS` (one day).
pub const MAX_DEFAULT_PROCESSING_SECS: f64 = 86_400.0;

/// Tunables for the queue service.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// ETA per job when a category has no completed history.
    pub default_processing_secs: f64,
    pub default_list_limit: i64,
    pub max_list_limit: i64,
    /// Prefix for the view/download URLs returned on completion.
    pub public_base_url: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_processing_secs: DEFAULT_PROCESSING_SECS,
            default_list_limit: DEFAULT_LIST_LIMIT,
            max_list_limit: MAX_LIST_LIMIT,
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl QueueConfig {
    /// Load queue settings from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `DEFAULT_PROCESSING_SECS` | `300`                   |
    /// | `PUBLIC_BASE_URL`         | `http://localhost:3000` |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_processing_secs: f64 = std::env::var("DEFAULT_PROCESSING_SECS")
            .map(|v| parse_processing_secs(&v).unwrap_or_else(|e| panic!("{e}")))
            .unwrap_or(defaults.default_processing_secs);

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_base_url);

        Self {
            default_processing_secs,
            public_base_url,
            ..defaults
        }
    }

    /// Clamp a requested page size into `[1, max_list_limit]`.
    pub fn clamp_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_list_limit)
            .clamp(1, self.max_list_limit)
    }
}

/// Parse `DEFAULT_PROCESSING_SECS`: a finite number of seconds in
/// `[0, MAX_DEFAULT_PROCESSING_SECS]`.
pub fn parse_processing_secs(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("DEFAULT_PROCESSING_SECS must be a number of seconds, got '{raw}'"))?;
    if !secs.is_finite() || !(0.0..=MAX_DEFAULT_PROCESSING_SECS).contains(&secs) {
        return Err(format!(
            "DEFAULT_PROCESSING_SECS must be between 0 and {MAX_DEFAULT_PROCESSING_SECS}, got '{raw}'"
        ));
    }
    Ok(secs)
}
