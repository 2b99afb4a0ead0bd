//! Mapping of domain and auth failures onto HTTP responses.
//!
//! This is the only place status codes for failures are chosen. Bodies follow two shapes:
//! field-keyed validation maps (`{"email": ["..."]}`) and `{"detail": "..."}` for everything else.

use api_shared::AuthError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinic_core::{ClinicError, FieldErrors};
use serde_json::json;

pub const NOT_FOUND: &str = "Not found.";

#[derive(Debug)]
pub enum ApiError {
    /// 400 with a field-keyed body.
    Validation(FieldErrors),
    /// A body axum could not read as JSON, with the status it chose (400, 413 or 415).
    Rejected(StatusCode, String),
    NotFound,
    Unauthorized(String),
    Forbidden(String),
    /// 500; the message is logged, never returned.
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::Validation(errors) => ApiError::Validation(errors),
            ClinicError::NotFound(_) => ApiError::NotFound,
            ClinicError::UnknownUser => ApiError::Unauthorized("User not found".into()),
            ClinicError::AccountDisabled => ApiError::Forbidden("User is inactive".into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials
            | AuthError::InvalidToken
            | AuthError::Expired
            | AuthError::WrongTokenType => ApiError::Unauthorized(err.to_string()),
            AuthError::Config(_) | AuthError::Signing(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

/// Ids in paths are integers; anything else names no resource.
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::Rejected(status, message) => detail(status, &message),
            ApiError::NotFound => detail(StatusCode::NOT_FOUND, NOT_FOUND),
            ApiError::Unauthorized(message) => {
                tracing::warn!(%message, "rejected credentials");
                let mut response = detail(StatusCode::UNAUTHORIZED, &message);
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    header::HeaderValue::from_static("Bearer"),
                );
                response
            }
            ApiError::Forbidden(message) => {
                tracing::warn!(%message, "forbidden");
                detail(StatusCode::FORBIDDEN, &message)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "request failed");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        }
    }
}
