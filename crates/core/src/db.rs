//! SQLite connection pool and schema.
//!
//! The schema is created idempotently at startup. Every connection enables foreign keys so that
//! deleting a user, patient or doctor cascades to the rows that reference it.

use crate::config::CoreConfig;
use crate::constants::DEFAULT_MAX_CONNECTIONS;
use crate::ClinicResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        is_active INTEGER NOT NULL DEFAULT 1,
        date_joined TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS patients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT NOT NULL,
        date_of_birth TEXT NOT NULL,
        gender TEXT NOT NULL,
        address TEXT NOT NULL,
        city TEXT NOT NULL,
        state TEXT NOT NULL,
        zip_code TEXT NOT NULL,
        blood_group TEXT,
        allergies TEXT,
        medical_history TEXT,
        created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS patients_created_by ON patients(created_by)",
    "CREATE TABLE IF NOT EXISTS doctors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT NOT NULL,
        license_number TEXT NOT NULL UNIQUE,
        specialization TEXT NOT NULL,
        experience_years INTEGER NOT NULL,
        qualification TEXT NOT NULL,
        hospital_name TEXT NOT NULL,
        hospital_address TEXT NOT NULL,
        city TEXT NOT NULL,
        state TEXT NOT NULL,
        consultation_fee TEXT NOT NULL,
        availability TEXT NOT NULL,
        bio TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS mappings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
        doctor_id INTEGER NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
        assigned_date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        notes TEXT,
        created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    // At most one active assignment per patient/doctor pair.
    "CREATE UNIQUE INDEX IF NOT EXISTS mappings_one_active_pair
        ON mappings(patient_id, doctor_id) WHERE status = 'active'",
    "CREATE INDEX IF NOT EXISTS mappings_created_by ON mappings(created_by)",
];

/// Open a pool for the configured database.
pub async fn connect(cfg: &CoreConfig) -> ClinicResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(cfg.database_url())?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    tracing::info!(database_url = %cfg.database_url(), "database pool opened");
    Ok(pool)
}

/// A private in-memory database with the schema applied.
///
/// Limited to one connection that is never recycled: each SQLite in-memory connection is its own
/// database.
pub async fn connect_in_memory() -> ClinicResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create any missing tables and indexes.
pub async fn init_schema(pool: &SqlitePool) -> ClinicResult<()> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// The constraint message if `err` is a unique violation, e.g.
/// `UNIQUE constraint failed: patients.email`.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Some(db_err.message()),
        _ => None,
    }
}
