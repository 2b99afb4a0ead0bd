//! Stateless bearer tokens.
//!
//! Tokens are compact `header.claims.signature` strings: base64url (no padding) JSON header and
//! claims, signed with HMAC-SHA256 over the first two segments. Two kinds are issued: a
//! short-lived `access` token presented on every request, and a longer-lived `refresh` token that
//! can only be exchanged for a new access token.
//!
//! The signing secret and lifetimes live in [`AuthConfig`], resolved once at startup.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 60;

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,
    #[error("Given token not valid for any token type")]
    InvalidToken,
    #[error("Token is expired")]
    Expired,
    #[error("Token has wrong type")]
    WrongTokenType,
    #[error("invalid auth configuration: {0}")]
    Config(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Token signing configuration.
#[derive(Clone)]
pub struct AuthConfig {
    secret: Vec<u8>,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(
        secret: &str,
        access_lifetime: Duration,
        refresh_lifetime: Duration,
    ) -> AuthResult<Self> {
        if secret.trim().is_empty() {
            return Err(AuthError::Config("JWT_SECRET cannot be empty".into()));
        }
        if access_lifetime <= Duration::zero() || refresh_lifetime <= Duration::zero() {
            return Err(AuthError::Config("token lifetimes must be positive".into()));
        }
        let now = Utc::now();
        if now.checked_add_signed(access_lifetime).is_none()
            || now.checked_add_signed(refresh_lifetime).is_none()
        {
            return Err(AuthError::Config("token lifetimes are out of range".into()));
        }

        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            access_lifetime,
            refresh_lifetime,
        })
    }

    /// Build the configuration from raw environment values.
    ///
    /// Missing or blank lifetimes fall back to [`DEFAULT_ACCESS_TOKEN_MINUTES`] and
    /// [`DEFAULT_REFRESH_TOKEN_DAYS`]. The secret is required.
    pub fn from_env_values(
        secret: Option<String>,
        access_minutes: Option<String>,
        refresh_days: Option<String>,
    ) -> AuthResult<Self> {
        fn parse_or(value: Option<String>, default: i64, name: &str) -> AuthResult<i64> {
            match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                Some(v) => v
                    .parse::<i64>()
                    .map_err(|_| AuthError::Config(format!("{name} must be an integer"))),
                None => Ok(default),
            }
        }

        let secret = secret.ok_or_else(|| AuthError::Config("JWT_SECRET not set".into()))?;
        let access = parse_or(
            access_minutes,
            DEFAULT_ACCESS_TOKEN_MINUTES,
            "ACCESS_TOKEN_LIFETIME_MINUTES",
        )?;
        let refresh = parse_or(
            refresh_days,
            DEFAULT_REFRESH_TOKEN_DAYS,
            "REFRESH_TOKEN_LIFETIME_DAYS",
        )?;

        let access = Duration::try_minutes(access).ok_or_else(|| {
            AuthError::Config("ACCESS_TOKEN_LIFETIME_MINUTES is out of range".into())
        })?;
        let refresh = Duration::try_days(refresh).ok_or_else(|| {
            AuthError::Config("REFRESH_TOKEN_LIFETIME_DAYS is out of range".into())
        })?;

        Self::new(&secret, access, refresh)
    }

    pub fn lifetime(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and verifies tokens. Cheap to clone.
#[derive(Clone, Debug)]
pub struct TokenService {
    cfg: Arc<AuthConfig>,
}

impl TokenService {
    pub fn new(cfg: Arc<AuthConfig>) -> Self {
        Self { cfg }
    }

    /// Issue a single token of the given type for `user_id`.
    pub fn issue(&self, user_id: i64, token_type: TokenType) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.cfg.lifetime(token_type))
            .ok_or_else(|| AuthError::Signing("token expiry is out of range".into()))?;
        let claims = Claims {
            sub: user_id,
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };
        self.sign(&claims)
    }

    pub fn issue_pair(&self, user_id: i64) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access)?,
            refresh: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    /// Verify signature, expiry and type of `token`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] if the token is malformed or the signature does not match
    /// - [`AuthError::Expired`] if `exp` is in the past
    /// - [`AuthError::WrongTokenType`] if the token is not of type `expected`
    pub fn verify(&self, token: &str, expected: TokenType) -> AuthResult<Claims> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::InvalidToken)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }

        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> AuthResult<String> {
        let header = Header {
            alg: "HS256".into(),
            typ: "JWT".into(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| AuthError::Signing(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(claims).map_err(|e| AuthError::Signing(e.to_string()))?;

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.mac()?;
        mac.update(message.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    fn mac(&self) -> AuthResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.cfg.secret).map_err(|e| AuthError::Signing(e.to_string()))
    }
}

/// Extract the token from an `Authorization` header value of the form `Bearer <token>`.
pub fn bearer_token(header_value: Option<&str>) -> AuthResult<&str> {
    let value = header_value.ok_or(AuthError::MissingCredentials)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token.trim())
}
