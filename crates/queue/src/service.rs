use std::sync::Arc;

use promptforge_core::error::CoreError;
use promptforge_core::types::{DbId, Timestamp};
use promptforge_db::models::job::Job;

use crate::clock::{Clock, SystemClock};
use crate::config::QueueConfig;
use crate::store::JobStore;

/// The queue service shared by HTTP handlers and background tasks.
///
/// Cheap to clone. Operations are split across modules by concern:
/// [`crate::admission`], [`crate::scheduling`], [`crate::lifecycle`] and
/// [`crate::reconciler`] each add an `impl ImageQueue` block.
#[derive(Clone)]
pub struct ImageQueue {
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: QueueConfig,
}

impl ImageQueue {
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>, config: QueueConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Queue over `store` using wall-clock time.
    pub fn with_system_clock(store: Arc<dyn JobStore>, config: QueueConfig) -> Self {
        Self::new(store, Arc::new(SystemClock), config)
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Load a job or fail with `NotFound`.
    pub async fn get_job(&self, job_id: DbId) -> Result<Job, CoreError> {
        self.store
            .find_job(job_id)
            .await?
            .ok_or_else(|| CoreError::job_not_found(job_id))
    }

    /// Whether the backing store is reachable.
    pub async fn store_healthy(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Job store health check failed");
                false
            }
        }
    }
}
