//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are never read during request handling.

use crate::constants::DEFAULT_DATABASE_URL;
use crate::{ClinicError, ClinicResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_url: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// Only SQLite URLs are accepted; the schema uses SQLite partial indexes.
    pub fn new(database_url: impl Into<String>) -> ClinicResult<Self> {
        let database_url = database_url.into();
        if database_url.trim().is_empty() {
            return Err(ClinicError::InvalidInput(
                "database_url cannot be empty".into(),
            ));
        }
        if !database_url.starts_with("sqlite:") {
            return Err(ClinicError::InvalidInput(
                "database_url must be a sqlite: URL".into(),
            ));
        }

        Ok(Self { database_url })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Resolve the database URL from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATABASE_URL`].
pub fn database_url_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_env_value_falls_back_to_default() {
        assert_eq!(database_url_from_env_value(None), DEFAULT_DATABASE_URL);
        assert_eq!(
            database_url_from_env_value(Some("  ".into())),
            DEFAULT_DATABASE_URL
        );
        assert_eq!(
            database_url_from_env_value(Some(" sqlite::memory: ".into())),
            "sqlite::memory:"
        );
    }

    #[test]
    fn rejects_empty_and_non_sqlite_urls() {
        assert!(CoreConfig::new("").is_err());
        assert!(CoreConfig::new("postgres://localhost/clinic").is_err());
        assert_eq!(
            CoreConfig::new("sqlite::memory:").unwrap().database_url(),
            "sqlite::memory:"
        );
    }
}
