//! Unified error type for the KetoHelper client.

use ketohelper_protocol::ProtocolError;
use ketohelper_refresh::RefreshError;
use ketohelper_session::SessionError;
use ketohelper_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `ketohelper` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each wrapping variant generates the `From` impl,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KetoError {
    /// The request never produced a usable response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response or token didn't have the expected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Durable storage failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A refresh attempt failed outside the interceptor's recovery.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// A 401 could not be recovered: the refresh failed and the session
    /// has been cleared. The user has to log in again.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// The request was retried with fresh credentials and still got 401.
    #[error("request unauthorized after token refresh")]
    Unauthorized,

    /// The backend answered with a non-2xx status other than 401.
    #[error("request failed with status {0}")]
    Status(u16),

    /// The client is missing configuration needed for this operation.
    #[error("configuration error: {0}")]
    Config(String),
}

impl KetoError {
    /// `true` if the user needs to log in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: KetoError = TransportError::RequestFailed("gone".into()).into();
        assert!(matches!(err, KetoError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: KetoError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, KetoError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: KetoError = SessionError::UnsupportedVersion(7).into();
        assert!(matches!(err, KetoError::Session(_)));
    }

    #[test]
    fn test_from_refresh_error() {
        let err: KetoError = RefreshError::MissingRefreshToken.into();
        assert!(matches!(err, KetoError::Refresh(_)));
        assert!(!err.requires_login());
    }

    #[test]
    fn test_requires_login() {
        assert!(KetoError::SessionExpired.requires_login());
        assert!(KetoError::Unauthorized.requires_login());
        assert!(!KetoError::Status(500).requires_login());
    }
}
