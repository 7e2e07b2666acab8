//! Credential types issued by the auth endpoints.
//!
//! Tokens are opaque strings to this crate. Nothing here parses, validates,
//! or tracks expiry client-side; expiry is discovered reactively when the
//! backend rejects a request.

use serde::{Deserialize, Serialize};

use super::UserProfile;

/// The credential pair issued by login/register.
///
/// The access token is short-lived and presented on every request; the
/// refresh token is longer-lived and only ever sent to the refresh and
/// logout endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Success body of `POST /auth/login/` and `POST /auth/register/`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Success body of `POST /auth/token/refresh/`.
///
/// `refresh` is present only when the backend rotates refresh tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
