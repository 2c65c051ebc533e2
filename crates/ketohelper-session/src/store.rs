//! The session store: the single shared, observable home of [`Session`].
//!
//! Every component that cares about authentication (the refresher, the
//! interceptor, the route guard, UI code) holds a clone of the same
//! [`SessionStore`] and goes through its operations. Nothing else touches
//! the persisted record.
//!
//! # Concurrency note
//!
//! The state lives inside a `tokio::sync::watch` channel. Mutations take
//! the channel's write lock only for the synchronous change itself, so
//! observers never see a half-applied login. The record is written to
//! storage after the lock is released; each change carries a revision, and
//! a snapshot older than the one already written is dropped, so storage
//! still ends up with the latest state. No lock is held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ketohelper_protocol::{User, UserPatch, now_epoch_secs};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    HeadlessNavigator, MemoryStorage, Navigator, ROOT_PATH, Session, SessionError, Storage,
    StoreConfig, persist,
};

/// Shared handle to the current session.
///
/// Cloning is cheap (an `Arc` bump); all clones see the same state.
///
/// ## Lifecycle
///
/// ```text
///   load() ──→ [guest] ──set_auth()──→ [signed in] ──clear()──→ [guest]
///                 │                        │    ↑
///                 │                        └────┘ set_access_token()
///                 └── ensure_guest_id()           (after a refresh)
/// ```
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<Session>,
    storage: Arc<dyn Storage>,
    navigator: Arc<dyn Navigator>,
    config: StoreConfig,
    /// Bumped under the state lock on every durable change.
    revision: AtomicU64,
    /// Revision of the last record handed to storage.
    persisted: Mutex<u64>,
}

impl SessionStore {
    /// Rehydrates the session from `storage`.
    ///
    /// A missing record starts an empty session. A record that can't be
    /// read, is corrupt, or comes from a newer client also starts an empty
    /// session; the failure is logged and otherwise ignored.
    pub fn load(
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
        config: StoreConfig,
    ) -> Self {
        let session = match read_record(storage.as_ref(), &config.storage_key) {
            Ok(Some(session)) => {
                tracing::info!(
                    signed_in = session.user.is_some(),
                    guest = session.is_guest,
                    "session restored"
                );
                session
            }
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable persisted session");
                Session::default()
            }
        };

        let (state, _) = watch::channel(session);
        Self {
            inner: Arc::new(StoreInner {
                state,
                storage,
                navigator,
                config,
                revision: AtomicU64::new(0),
                persisted: Mutex::new(0),
            }),
        }
    }

    /// An empty store backed by [`MemoryStorage`] and a
    /// [`HeadlessNavigator`] at `/`.
    pub fn in_memory() -> Self {
        Self::load(
            Arc::new(MemoryStorage::new()),
            Arc::new(HeadlessNavigator::default()),
            StoreConfig::default(),
        )
    }

    // -- Reads ------------------------------------------------------------

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// A receiver notified after every change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// `true` if a user and an unexpired access token are both present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated_at(now_epoch_secs())
    }

    /// `true` while a manual logout is running.
    pub fn is_logging_out(&self) -> bool {
        self.inner.state.borrow().logging_out
    }

    /// The navigator this store redirects through.
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    // -- Writes -----------------------------------------------------------

    /// Installs a freshly signed-in user and both tokens in one step.
    pub fn set_auth(&self, user: User, access_token: String, refresh_token: String) {
        let user_id = user.id.clone();
        self.update(|session| {
            session.user = Some(user);
            session.access_token = Some(access_token);
            session.refresh_token = Some(refresh_token);
            session.is_guest = false;
            true
        });
        tracing::info!(%user_id, "session authenticated");
    }

    /// Replaces only the access token.
    pub fn set_access_token(&self, token: String) {
        self.update(|session| {
            session.access_token = Some(token);
            true
        });
    }

    /// Replaces only the refresh token.
    pub fn set_refresh_token(&self, token: String) {
        self.update(|session| {
            session.refresh_token = Some(token);
            true
        });
    }

    /// Installs the result of a token refresh in one step. The refresh
    /// token is kept as-is when the backend didn't rotate it.
    pub fn set_tokens(&self, access_token: String, refresh_token: Option<String>) {
        self.update(|session| {
            session.access_token = Some(access_token);
            if let Some(refresh) = refresh_token {
                session.refresh_token = Some(refresh);
            }
            true
        });
    }

    /// Installs the result of a refresh that was requested with
    /// `sent_refresh_token`, but only if that token is still the stored one
    /// and a user is still signed in.
    ///
    /// Returns `false` and changes nothing when the session was cleared or
    /// replaced while the refresh was in flight.
    pub fn set_tokens_if_current(
        &self,
        sent_refresh_token: &str,
        access_token: String,
        refresh_token: Option<String>,
    ) -> bool {
        self.update(|session| {
            let current = session.user.is_some()
                && session.refresh_token.as_deref() == Some(sent_refresh_token);
            if !current {
                return false;
            }
            session.access_token = Some(access_token);
            if let Some(refresh) = refresh_token {
                session.refresh_token = Some(refresh);
            }
            true
        })
    }

    /// Merges `patch` into the current user. Returns `false` (and changes
    /// nothing) when nobody is signed in.
    pub fn update_user(&self, patch: &UserPatch) -> bool {
        self.update(|session| match session.user.as_mut() {
            Some(user) => {
                user.apply(patch);
                true
            }
            None => false,
        })
    }

    /// Signs the user out locally.
    ///
    /// Wipes the user and both tokens, returns to guest mode (the guest id
    /// is kept), and removes every dependent cache key. Navigates to `/`
    /// only if `should_redirect` is true; pass `false` on public pages so
    /// anonymous browsing isn't interrupted.
    pub fn clear(&self, should_redirect: bool) {
        self.update(|session| {
            session.user = None;
            session.access_token = None;
            session.refresh_token = None;
            session.is_guest = true;
            true
        });

        for key in &self.inner.config.dependent_keys {
            if let Err(e) = self.inner.storage.remove(key) {
                tracing::warn!(key, error = %e, "failed to remove dependent cache");
            }
        }

        tracing::info!(should_redirect, "session cleared");
        if should_redirect {
            self.inner.navigator.navigate(ROOT_PATH);
        }
    }

    /// Returns the guest id, generating and persisting one on first use.
    ///
    /// Repeated calls return the same id until the stored record is lost.
    pub fn ensure_guest_id(&self) -> String {
        let mut guest_id = String::new();
        let generated = self.update(|session| {
            if let Some(existing) = &session.guest_id {
                guest_id.clone_from(existing);
                return false;
            }
            guest_id = Uuid::new_v4().to_string();
            session.guest_id = Some(guest_id.clone());
            session.is_guest = session.user.is_none();
            true
        });
        if generated {
            tracing::debug!(%guest_id, "guest id generated");
        }
        guest_id
    }

    /// Marks a manual logout as running so the route guard stands down.
    pub fn begin_logout(&self) {
        self.update_transient(|session| {
            let changed = !session.logging_out;
            session.logging_out = true;
            changed
        });
    }

    /// Ends a manual logout and arms suppression of the next
    /// "login required" notice.
    pub fn finish_logout(&self) {
        self.update_transient(|session| {
            session.logging_out = false;
            session.suppress_login_notice = true;
            true
        });
    }

    /// Consumes the post-logout notice suppression. Returns `true` exactly
    /// once per finished logout.
    pub fn take_login_notice_suppression(&self) -> bool {
        let mut armed = false;
        self.update_transient(|session| {
            armed = std::mem::take(&mut session.suppress_login_notice);
            armed
        });
        armed
    }

    // -- Internals --------------------------------------------------------

    /// Applies `change`; if it reports a modification, notifies
    /// subscribers and persists the durable fields.
    fn update(&self, change: impl FnOnce(&mut Session) -> bool) -> bool {
        let mut pending = None;
        let changed = self.inner.state.send_if_modified(|session| {
            if !change(session) {
                return false;
            }
            let revision = self.inner.revision.fetch_add(1, Ordering::Relaxed) + 1;
            pending = Some((revision, session.clone()));
            true
        });
        if let Some((revision, snapshot)) = pending {
            self.persist(revision, &snapshot);
        }
        changed
    }

    /// Writes `session` unless a later revision has already been written.
    fn persist(&self, revision: u64, session: &Session) {
        let mut written = self
            .inner
            .persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *written > revision {
            tracing::trace!(revision, written = *written, "skipping stale session write");
            return;
        }
        let storage = self.inner.storage.as_ref();
        if let Err(e) = write_record(storage, &self.inner.config.storage_key, session) {
            tracing::warn!(error = %e, "failed to persist session");
        }
        *written = revision;
    }

    /// Like [`update`](Self::update) for fields that are never persisted.
    fn update_transient(&self, change: impl FnOnce(&mut Session) -> bool) -> bool {
        self.inner.state.send_if_modified(change)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.state.borrow();
        f.debug_struct("SessionStore")
            .field("signed_in", &session.user.is_some())
            .field("is_guest", &session.is_guest)
            .field("storage_key", &self.inner.config.storage_key)
            .finish_non_exhaustive()
    }
}

fn read_record(storage: &dyn Storage, key: &str) -> Result<Option<Session>, SessionError> {
    match storage.get(key)? {
        Some(raw) => persist::decode(raw.as_bytes()).map(Some),
        None => Ok(None),
    }
}

fn write_record(storage: &dyn Storage, key: &str, session: &Session) -> Result<(), SessionError> {
    let bytes = persist::encode(session)?;
    // `encode` only ever produces JSON, which is UTF-8.
    let text = String::from_utf8_lossy(&bytes);
    storage.set(key, &text)
}

// =========================================================================
// Tests
// =========================================================================
