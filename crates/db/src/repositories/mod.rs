//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! take `&PgPool`; writes that must share a transaction take
//! `&mut PgConnection` so callers can pass `&mut *tx`.

pub mod image_repo;
pub mod job_repo;
pub mod job_transition_repo;

pub use image_repo::ImageRepo;
pub use job_repo::JobRepo;
pub use job_transition_repo::JobTransitionRepo;
