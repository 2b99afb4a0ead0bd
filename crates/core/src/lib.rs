//! # Clinic Core
//!
//! Core business logic for the clinic records system.
//!
//! This crate contains pure data operations over a SQLite store:
//! - User accounts with argon2 password hashes
//! - Patients scoped to the user who created them
//! - A shared directory of doctors
//! - Patient/doctor assignments ("mappings") with their cross-record rules
//!
//! **No API concerns**: token handling, HTTP servers and status codes belong in `api-shared` or
//! `api-rest`.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod repositories;
pub mod validation;

pub use config::CoreConfig;
pub use error::{ClinicError, ClinicResult};
pub use repositories::doctors::{Doctor, DoctorService};
pub use repositories::mappings::{Mapping, MappingService};
pub use repositories::patients::{Patient, PatientService};
pub use repositories::users::{User, UserService};
pub use validation::FieldErrors;

pub use clinic_types::{EmailAddress, NonEmptyText};
pub use sqlx::SqlitePool;
