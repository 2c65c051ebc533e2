//! Codec trait and implementations for serializing/deserializing records.
//!
//! The session store persists a versioned record to durable storage. It
//! doesn't care how that record becomes bytes; it only needs something
//! implementing [`Codec`]. [`JsonCodec`] is the only implementation today;
//! JSON keeps the stored record readable when debugging a broken session.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside the shared
/// session store, which is cloned into spawned refresh tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use ketohelper_protocol::{Codec, JsonCodec, TokenPair};
///
/// let codec = JsonCodec;
/// let pair = TokenPair {
///     access_token: "a.b.c".into(),
///     refresh_token: Some("r-1".into()),
/// };
///
/// let bytes = codec.encode(&pair).unwrap();
/// let decoded: TokenPair = codec.decode(&bytes).unwrap();
/// assert_eq!(pair, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
