//! Wire protocol for the KetoHelper session layer.
//!
//! This crate defines what the client and the auth backend exchange:
//!
//! - **Types** ([`User`], [`AuthResponse`], [`TokenPair`], the login and
//!   refresh request bodies): the JSON shapes of the `/auth/*` endpoints.
//! - **Claims** ([`TokenClaims`], [`decode_claims`]): reading the payload
//!   segment of a bearer token. Decoding only: nothing here verifies a
//!   signature. The server is the sole verifier; the client reads `exp`,
//!   `name` and `email` purely to schedule refreshes and refresh displayed
//!   identity.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how persisted records are
//!   turned into bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (HTTP bytes) → Protocol (typed bodies, claims) → Session (state)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod claims;
mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-util"))]
pub use claims::testing;
pub use claims::{
    TokenClaims, decode_claims, is_token_expired, now_epoch_secs,
    seconds_until_expiry, try_decode_claims,
};
pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    AuthResponse, NaverLoginRequest, Provider, RefreshRequest,
    SocialLoginRequest, TokenPair, User, UserPatch, endpoints,
};
