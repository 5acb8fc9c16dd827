//! Image-generation job queue service.
//!
//! [`ImageQueue`] ties the pure rules in `promptforge_core` to a
//! [`store::JobStore`]: admission, the scheduling view, lifecycle
//! transitions and completion reconciliation. All coordination between
//! concurrent callers happens inside the store's conditional updates.

pub mod admission;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod pg;
pub mod reconciler;
pub mod scheduling;
pub mod service;
pub mod store;
pub mod views;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::QueueConfig;
pub use error::StoreError;
pub use memory::MemoryJobStore;
pub use pg::PgJobStore;
pub use service::ImageQueue;
pub use store::{JobChange, JobStore};
