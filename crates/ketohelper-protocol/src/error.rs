//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means the bytes were wrong (bad JSON, a token
//! that is not three segments, invalid base64), never that the network or
//! the session misbehaved.

/// Errors that can occur while encoding, decoding, or validating wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or wrong data types.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bearer token does not have the `header.payload.signature` shape.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token's payload segment is not valid base64.
    #[error("invalid base64 in token payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The body parsed but violates a protocol rule, e.g. a login
    /// response carrying an empty access token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
