//! # API Shared
//!
//! Shared utilities and definitions for the clinic API.
//!
//! Contains:
//! - Wire types for request drafts and response envelopes (`wire` module)
//! - Shared services like `HealthService`
//! - Bearer token issuance and verification (`auth` module)
//!
//! Used by `clinic-core` (which builds response bodies) and `api-rest`.

pub mod auth;
pub mod health;
pub mod wire;

pub use auth::{AuthConfig, AuthError, Claims, TokenPair, TokenService, TokenType};
pub use health::HealthService;
pub use wire::*;
