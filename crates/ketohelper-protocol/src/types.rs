//! Request and response bodies for the `/auth/*` endpoints.
//!
//! Field names follow the backend exactly: request bodies are snake_case
//! (`access_token`, `refresh_token`, `redirect_uri`) while response bodies
//! are camelCase (`accessToken`, `refreshToken`, `profileImage`). Serde
//! attributes carry that asymmetry so the rest of the workspace only ever
//! sees Rust field names.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{ProtocolError, TokenClaims};

/// Endpoint paths, relative to the API base URL.
pub mod endpoints {
    pub const GOOGLE_LOGIN: &str = "/auth/google";
    pub const KAKAO_LOGIN: &str = "/auth/kakao";
    pub const NAVER_LOGIN: &str = "/auth/naver";
    pub const REFRESH: &str = "/auth/refresh";
    pub const LOGOUT: &str = "/auth/logout";
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The signed-in user as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend user id. Some endpoints send it as a number; it is kept as
    /// a string either way.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl User {
    /// Merges every field present in `patch` into this record.
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(email) = &patch.email {
            self.email.clone_from(email);
        }
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(image) = &patch.profile_image {
            self.profile_image = Some(image.clone());
        }
    }
}

/// A partial update to a [`User`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub profile_image: Option<String>,
}

impl UserPatch {
    /// Identity hints carried by an access token's claims.
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            email: claims.email.clone(),
            name: claims.name.clone(),
            profile_image: None,
        }
    }

    /// `true` if applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.profile_image.is_none()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Social login providers supported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Kakao,
    Naver,
}

impl Provider {
    /// The login endpoint for this provider.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::Google => endpoints::GOOGLE_LOGIN,
            Self::Kakao => endpoints::KAKAO_LOGIN,
            Self::Naver => endpoints::NAVER_LOGIN,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Kakao => write!(f, "kakao"),
            Self::Naver => write!(f, "naver"),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body for `/auth/google` and `/auth/kakao`: the provider's access token.
#[derive(Debug, Clone, Serialize)]
pub struct SocialLoginRequest<'a> {
    pub access_token: &'a str,
}

/// Body for `/auth/naver`: the authorization-code exchange.
#[derive(Debug, Clone, Serialize)]
pub struct NaverLoginRequest<'a> {
    pub code: &'a str,
    pub state: &'a str,
    pub redirect_uri: &'a str,
}

/// Body for `/auth/refresh`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Successful login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    /// Rejects responses that would leave the session half-populated.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if either token is empty.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.access_token.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "login response has an empty access token".into(),
            ));
        }
        if self.refresh_token.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "login response has an empty refresh token".into(),
            ));
        }
        Ok(())
    }
}

/// Successful refresh response. The backend may or may not rotate the
/// refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}
