//! Constants used throughout the clinic core crate.

/// Database used when `DATABASE_URL` is not configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://clinic.db?mode=rwc";

/// Maximum pooled connections for file-backed databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Column limits shared by users, patients and doctors.
pub const NAME_MAX_LEN: usize = 50;
pub const USER_NAME_MAX_LEN: usize = 150;
pub const PHONE_MAX_LEN: usize = 15;
pub const CITY_MAX_LEN: usize = 50;
pub const STATE_MAX_LEN: usize = 50;
pub const ZIP_CODE_MAX_LEN: usize = 10;
pub const BLOOD_GROUP_MAX_LEN: usize = 5;
pub const LICENSE_NUMBER_MAX_LEN: usize = 50;
pub const QUALIFICATION_MAX_LEN: usize = 200;
pub const HOSPITAL_NAME_MAX_LEN: usize = 100;

/// Consultation fees are stored with exactly this many decimal places.
pub const FEE_DECIMAL_PLACES: u32 = 2;
/// Maximum digits of a consultation fee, including the decimal places.
pub const FEE_MAX_DIGITS: u32 = 10;

/// Largest accepted `experience_years`.
pub const MAX_EXPERIENCE_YEARS: i64 = 2_147_483_647;
