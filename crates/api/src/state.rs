use std::sync::Arc;

use promptforge_queue::ImageQueue;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// The job queue service.
    pub queue: ImageQueue,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
