//! Request extractors.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::bearer_token;
use api_shared::{AuthError, TokenType};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use clinic_core::User;

/// The user behind a valid `Authorization: Bearer <access token>` header.
///
/// Rejects with 401 when the header is missing or the token is invalid, expired, of the wrong
/// type or belongs to a deleted account, and with 403 when the account is disabled.
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidToken)?),
        };
        let token = bearer_token(header)?;
        let claims = state.tokens.verify(token, TokenType::Access)?;
        let user = state.users.find_active(claims.sub).await?;
        Ok(AuthUser(user))
    }
}

/// JSON body whose rejections use the API's error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path parameters; a malformed id is reported as not found.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);
