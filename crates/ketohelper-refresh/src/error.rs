//! Error types for token refresh.

use ketohelper_transport::TransportError;

/// Why a refresh attempt failed.
///
/// Every variant leaves the session store exactly as it was; callers
/// decide whether a failure means "sign out" (the interceptor) or "treat
/// as anonymous" (the route guard).
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// No refresh token is stored, so no request was sent.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The backend answered with a non-2xx status.
    #[error("refresh rejected with status {0}")]
    Rejected(u16),

    /// The request never produced a response, or its body didn't parse.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response parsed but carried no usable access token.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The session was cleared or replaced while the request was in
    /// flight; the new tokens were discarded.
    #[error("session changed during refresh, tokens discarded")]
    Superseded,
}
