//! Route handlers, grouped by resource.

pub mod auth;
pub mod doctors;
pub mod health;
pub mod mappings;
pub mod patients;
