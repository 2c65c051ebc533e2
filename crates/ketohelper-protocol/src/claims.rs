//! Bearer-token claim decoding.
//!
//! Access tokens are JWTs: three base64url segments joined by dots. The
//! client only ever looks at the middle one, and only to read `exp` (when
//! to refresh), `name` and `email` (to update displayed identity without a
//! profile fetch).
//!
//! # Trust boundary
//!
//! Nothing in this module verifies a signature. A forged token decodes just
//! as happily as a real one. That is acceptable because every decision made
//! from these claims is advisory: the worst a bad `exp` can do is trigger a
//! refresh too early or too late, and the server rejects invalid tokens
//! with a 401 which the interceptor handles.
//!
//! # Failure policy
//!
//! [`decode_claims`] never fails. A malformed token yields `None`, and
//! callers treat `None` as "unknown expiry, assume not expired".

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ProtocolError;

/// Claims read from an access token's payload segment.
///
/// Every field is optional: tokens issued by different backends carry
/// different claim sets, and unknown claims are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry, in seconds since the Unix epoch.
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
    /// Issued-at, in seconds since the Unix epoch.
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,
    /// Subject; the backend puts the user id here, sometimes as a number.
    #[serde(default, deserialize_with = "subject")]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenClaims {
    /// `true` if `exp` is present and not after `now_secs`.
    ///
    /// A missing `exp` is treated as "not expired".
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_secs)
    }

    /// Seconds remaining until `exp` (negative once expired).
    pub fn seconds_until_expiry(&self, now_secs: i64) -> Option<i64> {
        self.exp.map(|exp| exp - now_secs)
    }
}

/// JWT NumericDate may legally be fractional; seconds are all we need.
#[allow(clippy::cast_possible_truncation)]
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| v.floor() as i64))
}

fn subject<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes the claims of `token`, reporting exactly what was wrong.
///
/// Accepts a bare token or one prefixed with `Bearer `. The payload may be
/// padded or unpadded, url-safe or standard alphabet.
///
/// # Errors
/// - [`ProtocolError::MalformedToken`] if the token isn't three segments
/// - [`ProtocolError::Base64`] if the payload isn't base64
/// - [`ProtocolError::Decode`] if the payload isn't a JSON claims object
pub fn try_decode_claims(token: &str) -> Result<TokenClaims, ProtocolError> {
    let token = token.trim();
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let segments: Vec<&str> = token.split('.').collect();
    let [_header, payload, _signature] = segments.as_slice() else {
        return Err(ProtocolError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))?;

    serde_json::from_slice(&bytes).map_err(ProtocolError::Decode)
}

/// Decodes the claims of `token`, or `None` if it can't be read.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    match try_decode_claims(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!(error = %e, "could not decode token claims");
            None
        }
    }
}

/// `true` only if `token` decodes and its `exp` is not after `now_secs`.
///
/// Undecodable tokens count as not expired: the server stays the
/// authority and will answer 401 if the token is actually bad.
pub fn is_token_expired(token: &str, now_secs: i64) -> bool {
    decode_claims(token).is_some_and(|claims| claims.is_expired_at(now_secs))
}

/// Seconds until `token` expires, or `None` if it has no readable `exp`.
pub fn seconds_until_expiry(token: &str, now_secs: i64) -> Option<i64> {
    decode_claims(token)?.seconds_until_expiry(now_secs)
}

/// Current wall-clock time in seconds since the Unix epoch.
///
/// Token expiry is wall-clock by definition, so this deliberately does
/// not use a monotonic clock. A clock set before 1970 reads as 0.
#[allow(clippy::cast_possible_wrap)]
pub fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Helpers for minting unsigned tokens in tests.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    /// Builds `header.payload.signature` with `payload` as the claims.
    /// The signature segment is a fixed placeholder.
    pub fn token_with_claims(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    /// A token expiring `secs_from_now` seconds from the real clock
    /// (negative for an already-expired token).
    pub fn token_expiring_in(secs_from_now: i64) -> String {
        let exp = super::now_epoch_secs() + secs_from_now;
        token_with_claims(&serde_json::json!({ "exp": exp }))
    }
}
