use promptforge_core::error::CoreError;

/// Failure inside a [`crate::store::JobStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Job store operation failed");
        CoreError::Storage(err.to_string())
    }
}
