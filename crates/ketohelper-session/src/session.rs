//! Session types: the data that represents who is using the app.
//!
//! A session tracks:
//! - WHO is signed in (`user`), if anyone
//! - HOW to prove it to the backend (`access_token`, `refresh_token`)
//! - WHICH anonymous visitor this is when nobody is signed in (`guest_id`)
//! - two transient flags the route guard uses around a manual logout

use ketohelper_protocol::{User, is_token_expired};

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Where and how the session is persisted.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Storage key of the persisted session record.
    pub storage_key: String,

    /// Keys of cached state derived from the signed-in user (the profile
    /// cache, for instance). They are removed whenever the session is
    /// cleared so the next user never sees the previous one's data.
    pub dependent_keys: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: "auth-storage".to_string(),
            dependent_keys: vec!["profile-storage".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The current authentication state.
///
/// `user` and `access_token` are written together by login and cleared
/// together by [`SessionStore::clear`](crate::SessionStore::clear). If
/// they ever disagree (a rehydrated record missing one of them), the
/// session simply isn't [authenticated](Self::is_authenticated_at).
///
/// `logging_out` and `suppress_login_notice` are transient: they are never
/// persisted and always start `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Stable anonymous identifier, generated on first use.
    pub guest_id: Option<String>,
    /// `true` whenever no authenticated user is attached.
    pub is_guest: bool,
    /// A manual logout is in progress; the route guard stands down.
    pub logging_out: bool,
    /// Skip the next "login required" toast (armed by a finished logout).
    pub suppress_login_notice: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            access_token: None,
            refresh_token: None,
            guest_id: None,
            is_guest: true,
            logging_out: false,
            suppress_login_notice: false,
        }
    }
}

impl Session {
    /// `true` if a user and an access token are both present and the token
    /// hasn't expired at `now_secs`.
    ///
    /// A token whose expiry can't be read counts as valid here; the server
    /// remains the authority and will answer 401 if it isn't.
    pub fn is_authenticated_at(&self, now_secs: i64) -> bool {
        self.user.is_some()
            && self
                .access_token
                .as_deref()
                .is_some_and(|token| !is_token_expired(token, now_secs))
    }

    /// `true` if the access token is present and expired at `now_secs`.
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        self.access_token
            .as_deref()
            .is_some_and(|token| is_token_expired(token, now_secs))
    }
}
