//! Persistence services, one per resource.
//!
//! Each service wraps a shared [`sqlx::SqlitePool`]; cloning a service is cheap.

pub mod doctors;
pub mod mappings;
pub mod patients;
pub mod users;
