//! The route guard: decides what happens when the user lands on a page.
//!
//! Runs once per navigation. The decision sequence:
//!
//! ```text
//! on_navigate(path)
//!   ├─ logout in progress ─────────────→ Skipped(LoggingOut)
//!   ├─ same path < min_interval ago ───→ Skipped(Debounced)
//!   ├─ session valid ──────────────────→ Authenticated   (prompt closed)
//!   ├─ silent refresh succeeds ────────→ Refreshed       (prompt closed)
//!   └─ refresh fails → clear(false), then by policy:
//!        ├─ Protected ─────────────────→ Redirected      (navigate "/")
//!        ├─ ModalGated, prompt closed ─→ LoginPrompted   (toast + open)
//!        ├─ ModalGated, prompt open ───→ LoginPromptAlreadyOpen
//!        └─ Public ────────────────────→ Anonymous
//! ```
//!
//! The guard and the HTTP interceptor refresh independently and may
//! overlap. That is safe: the backend rotates refresh tokens and whichever
//! refresh lands last wins in the store.

use std::sync::{Arc, Mutex, PoisonError};

use ketohelper_refresh::TokenRefresher;
use ketohelper_session::{ROOT_PATH, SessionStore};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::route_path;
use crate::{GuardConfig, LoginPrompt, Notifier, RoutePolicy, RouteTable};

/// Why a navigation was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A manual logout is running and will redirect on its own.
    LoggingOut,
    /// The same path was evaluated less than `min_interval` ago.
    Debounced,
}

/// What the guard did for one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Skipped(SkipReason),
    /// The session was already valid.
    Authenticated,
    /// The session had lapsed and a silent refresh restored it.
    Refreshed,
    /// Protected page without a session: sent to `/`.
    Redirected,
    /// Modal-gated page without a session: the login prompt was opened.
    /// `notified` is `false` when the toast was suppressed after a logout.
    LoginPrompted { notified: bool },
    /// Modal-gated page without a session, prompt already showing.
    LoginPromptAlreadyOpen,
    /// Public page without a session: nothing to do.
    Anonymous,
}

/// Navigation guard. One per app; share it behind an `Arc`.
pub struct RouteGuard<R> {
    store: SessionStore,
    refresher: R,
    routes: Arc<RouteTable>,
    config: GuardConfig,
    prompt: Arc<dyn LoginPrompt>,
    notifier: Arc<dyn Notifier>,
    /// Last evaluated path and when.
    last_check: Mutex<Option<(String, Instant)>>,
}

impl<R: TokenRefresher> RouteGuard<R> {
    pub fn new(
        store: SessionStore,
        refresher: R,
        routes: Arc<RouteTable>,
        config: GuardConfig,
        prompt: Arc<dyn LoginPrompt>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            refresher,
            routes,
            config: config.validated(),
            prompt,
            notifier,
            last_check: Mutex::new(None),
        }
    }

    /// Evaluates the session for a navigation to `path`.
    pub async fn on_navigate(&self, path: &str) -> GuardOutcome {
        if self.store.is_logging_out() {
            debug!(path, "guard skipped: logout in progress");
            return GuardOutcome::Skipped(SkipReason::LoggingOut);
        }

        let path = route_path(path);
        if self.debounced(path) {
            debug!(path, "guard skipped: debounced");
            return GuardOutcome::Skipped(SkipReason::Debounced);
        }

        // The post-logout suppression covers exactly one evaluation.
        let suppress_notice = self.store.take_login_notice_suppression();

        if self.store.is_authenticated() {
            self.prompt.close();
            return GuardOutcome::Authenticated;
        }

        // A refresh only counts if it left a complete session behind; the
        // store can also have been signed in by someone else meanwhile.
        let refreshed = self.refresher.refresh_tokens().await;
        if self.store.is_authenticated() {
            self.prompt.close();
            return match refreshed {
                Ok(_) => {
                    debug!(path, "session restored by silent refresh");
                    GuardOutcome::Refreshed
                }
                Err(_) => GuardOutcome::Authenticated,
            };
        }
        match refreshed {
            Ok(_) => debug!(path, "refresh left no signed-in user"),
            Err(e) => debug!(path, error = %e, "silent refresh failed"),
        }

        self.store.clear(false);

        let policy = self.routes.classify(path);
        let outcome = match policy {
            RoutePolicy::Protected => {
                self.store.navigator().navigate(ROOT_PATH);
                GuardOutcome::Redirected
            }
            RoutePolicy::ModalGated if self.prompt.is_open() => {
                GuardOutcome::LoginPromptAlreadyOpen
            }
            RoutePolicy::ModalGated => {
                let notified = !suppress_notice;
                if notified {
                    self.notifier.toast(&self.config.login_required_message);
                }
                self.prompt.open();
                GuardOutcome::LoginPrompted { notified }
            }
            RoutePolicy::Public => GuardOutcome::Anonymous,
        };
        info!(path, %policy, ?outcome, "unauthenticated navigation");
        outcome
    }

    /// Called when the user closes the login prompt without logging in.
    ///
    /// Sends them to `/` and returns `true` if the session is still not
    /// valid; returns `false` (and stays put) otherwise.
    pub fn on_login_prompt_dismissed(&self) -> bool {
        if self.store.is_authenticated() {
            return false;
        }
        self.prompt.close();
        self.store.navigator().navigate(ROOT_PATH);
        true
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn prompt(&self) -> &Arc<dyn LoginPrompt> {
        &self.prompt
    }

    /// Records this check and reports whether the previous one was the same
    /// path within `min_interval`.
    fn debounced(&self, path: &str) -> bool {
        let now = Instant::now();
        let mut last = self
            .last_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let repeat = last.as_ref().is_some_and(|(last_path, at)| {
            last_path == path && now.duration_since(*at) < self.config.min_interval
        });
        if !repeat {
            *last = Some((path.to_string(), now));
        }
        repeat
    }
}
