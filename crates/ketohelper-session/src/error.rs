//! Error types for the session layer.

use ketohelper_protocol::ProtocolError;

/// Errors that can occur while loading or persisting a session.
///
/// None of these ever reach UI code: the store logs them and falls back to
/// an empty session (on load) or keeps the in-memory state (on save).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The storage backend failed to read, write, or remove a key.
    #[error("storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    /// The persisted record isn't valid JSON or has the wrong shape.
    #[error("persisted session is corrupt: {0}")]
    Corrupt(#[from] ProtocolError),

    /// The persisted record was written by a newer client.
    #[error("persisted session has unsupported version {0}")]
    UnsupportedVersion(u64),
}
