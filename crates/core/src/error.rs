use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    /// Bad, missing or conflicting input. Carries field-keyed messages for the client.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    /// No record of the given kind is visible to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("user no longer exists")]
    UnknownUser,
    #[error("user account is disabled")]
    AccountDisabled,

    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to hash password: {0}")]
    PasswordHash(String),
    #[error("corrupt stored value in {column}: {message}")]
    CorruptValue {
        column: &'static str,
        message: String,
    },
}

impl From<FieldErrors> for ClinicError {
    fn from(errors: FieldErrors) -> Self {
        ClinicError::Validation(errors)
    }
}

impl ClinicError {
    pub(crate) fn corrupt(column: &'static str, message: impl std::fmt::Display) -> Self {
        ClinicError::CorruptValue {
            column,
            message: message.to_string(),
        }
    }

    /// The field errors, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ClinicError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
