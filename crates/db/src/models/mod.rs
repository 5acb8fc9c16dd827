//! Row structs and insert DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and a plain struct carrying the values for an insert.

pub mod image;
pub mod job;
pub mod job_transition;
