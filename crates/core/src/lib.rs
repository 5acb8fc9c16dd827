//! Domain types and pure logic for the image-generation job queue.
//!
//! No I/O lives here: status transitions, admission rules, queue ordering,
//! ETA estimation and completion-report checks are plain functions so the
//! store, the service layer and the HTTP layer all share one definition.

pub mod completion;
pub mod error;
pub mod estimation;
pub mod generation;
pub mod lifecycle;
pub mod scheduling;
pub mod types;
