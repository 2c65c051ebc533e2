//! The persisted session record and its version migrations.
//!
//! Only the durable subset of [`Session`] is written:
//! `{user, accessToken, refreshToken, guestId, isGuest}`, wrapped in a
//! versioned envelope:
//!
//! ```json
//! { "version": 1, "state": { "user": null, "accessToken": null, ... } }
//! ```
//!
//! Version 0 is the legacy shape: no `version` key, no guest fields, and
//! sometimes no `state` wrapper either. Migration fills every absent field
//! with its empty value and derives `isGuest` from the user.

use ketohelper_protocol::{Codec, JsonCodec, User};
use serde::{Deserialize, Serialize};

use crate::{Session, SessionError};

/// Version written by this client.
pub const CURRENT_VERSION: u64 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    guest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_guest: Option<bool>,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    version: u64,
    state: &'a PersistedState,
}

impl From<&Session> for PersistedState {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            guest_id: session.guest_id.clone(),
            is_guest: Some(session.is_guest),
        }
    }
}

impl PersistedState {
    fn into_session(self) -> Session {
        let is_guest = self.is_guest.unwrap_or(self.user.is_none());
        Session {
            user: self.user,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            guest_id: self.guest_id,
            is_guest,
            ..Session::default()
        }
    }
}

/// Serializes the durable part of `session`.
pub(crate) fn encode(session: &Session) -> Result<Vec<u8>, SessionError> {
    let state = PersistedState::from(session);
    let envelope = Envelope {
        version: CURRENT_VERSION,
        state: &state,
    };
    Ok(JsonCodec.encode(&envelope)?)
}

/// Parses a persisted record of any known version into a [`Session`].
pub(crate) fn decode(bytes: &[u8]) -> Result<Session, SessionError> {
    let record: serde_json::Value = JsonCodec.decode(bytes)?;

    let version = record
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    if version > CURRENT_VERSION {
        return Err(SessionError::UnsupportedVersion(version));
    }

    let state = match record.get("state") {
        Some(state) => state.clone(),
        None if version == 0 => record,
        None => serde_json::Value::Null,
    };
    if state.is_null() {
        return Ok(Session::default());
    }

    let state: PersistedState = serde_json::from_value(state)
        .map_err(|e| SessionError::Corrupt(ketohelper_protocol::ProtocolError::Decode(e)))?;

    if version < CURRENT_VERSION {
        tracing::info!(from = version, to = CURRENT_VERSION, "migrating persisted session");
    }
    Ok(state.into_session())
}
