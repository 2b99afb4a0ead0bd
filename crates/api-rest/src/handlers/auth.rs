use crate::error::{ApiError, ApiResult};
use crate::extract::AppJson;
use crate::AppState;
use api_shared::{
    AuthRes, LoginReq, RefreshReq, RefreshRes, RegisterReq, TokenPair, TokenType, TokensRes,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use clinic_core::validation::REQUIRED;
use clinic_core::{FieldErrors, User};

fn auth_res(message: &str, user: &User, tokens: TokenPair) -> AuthRes {
    AuthRes {
        message: message.into(),
        user: user.to_res(),
        tokens: TokensRes {
            access: tokens.access,
            refresh: tokens.refresh,
        },
    }
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = AuthRes),
        (status = 400, description = "Field-keyed validation errors")
    )
)]
/// Create an account and return a fresh token pair.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterReq>,
) -> ApiResult<(StatusCode, Json<AuthRes>)> {
    let user = state.users.register(req).await?;
    let tokens = state.tokens.issue_pair(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(auth_res("User registered successfully", &user, tokens)),
    ))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = AuthRes),
        (status = 400, description = "Invalid credentials or disabled account")
    )
)]
/// Exchange a username and password for a token pair.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginReq>,
) -> ApiResult<Json<AuthRes>> {
    let user = state.users.authenticate(req).await?;
    let tokens = state.tokens.issue_pair(user.id)?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(auth_res("Login successful", &user, tokens)))
}

#[utoipa::path(
    post,
    path = "/token/refresh/",
    tag = "auth",
    request_body = RefreshReq,
    responses(
        (status = 200, description = "New access token", body = RefreshRes),
        (status = 400, description = "Missing refresh token"),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
/// Issue a new access token from a refresh token.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshReq>,
) -> ApiResult<Json<RefreshRes>> {
    let Some(token) = req.refresh.filter(|t| !t.trim().is_empty()) else {
        return Err(ApiError::Validation(FieldErrors::single("refresh", REQUIRED)));
    };

    let claims = state.tokens.verify(token.trim(), TokenType::Refresh)?;
    let user = state.users.find_active(claims.sub).await?;
    let access = state.tokens.issue(user.id, TokenType::Access)?;
    Ok(Json(RefreshRes { access }))
}
