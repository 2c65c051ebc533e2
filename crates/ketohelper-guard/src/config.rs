//! Route classification and guard configuration.

use std::time::Duration;

use tracing::warn;

// ---------------------------------------------------------------------------
// RoutePolicy
// ---------------------------------------------------------------------------

/// How sensitive a route is to the session state.
///
/// - **Protected**: unusable without a session. Unauthenticated users are
///   sent back to `/`.
/// - **ModalGated**: the page renders for anyone, but its actions need a
///   login, so the guard opens the login prompt over it.
/// - **Public**: anonymous browsing is fine. The guard never interrupts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutePolicy {
    Protected,
    ModalGated,
    Public,
}

impl std::fmt::Display for RoutePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protected => write!(f, "protected"),
            Self::ModalGated => write!(f, "modal-gated"),
            Self::Public => write!(f, "public"),
        }
    }
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// Maps path prefixes to [`RoutePolicy`]. Immutable once built.
///
/// Matching works on whole path segments: `/profile` covers `/profile` and
/// `/profile/edit` but not `/profiles`. The query string and fragment are
/// ignored. A path matching both a protected and a modal-gated prefix is
/// protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    protected: Vec<String>,
    modal_gated: Vec<String>,
}

impl RouteTable {
    /// Protected prefixes used by the app.
    pub const DEFAULT_PROTECTED: [&'static str; 6] = [
        "/profile",
        "/calendar",
        "/settings",
        "/dashboard",
        "/my-plans",
        "/favorites",
    ];

    /// Modal-gated prefixes used by the app.
    pub const DEFAULT_MODAL_GATED: [&'static str; 1] = ["/subscribe"];

    pub fn new<P, M>(protected: P, modal_gated: M) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            protected: protected.into_iter().map(normalize_prefix).collect(),
            modal_gated: modal_gated.into_iter().map(normalize_prefix).collect(),
        }
    }

    /// Classifies `path`. Anything unlisted is [`RoutePolicy::Public`].
    pub fn classify(&self, path: &str) -> RoutePolicy {
        let path = route_path(path);
        if self.protected.iter().any(|p| matches_prefix(path, p)) {
            RoutePolicy::Protected
        } else if self.modal_gated.iter().any(|p| matches_prefix(path, p)) {
            RoutePolicy::ModalGated
        } else {
            RoutePolicy::Public
        }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.classify(path) == RoutePolicy::Protected
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROTECTED, Self::DEFAULT_MODAL_GATED)
    }
}

/// `path` without its query string or fragment.
pub fn route_path(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn normalize_prefix(prefix: impl Into<String>) -> String {
    let mut prefix = prefix.into();
    while prefix.ends_with('/') {
        prefix.pop();
    }
    prefix
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// GuardConfig
// ---------------------------------------------------------------------------

/// Tunables for [`RouteGuard`](crate::RouteGuard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// A repeat check of the same path within this window is skipped.
    pub min_interval: Duration,

    /// Toast shown when a modal-gated page needs a login.
    pub login_required_message: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            login_required_message: "로그인이 필요한 기능입니다.".to_string(),
        }
    }
}

impl GuardConfig {
    /// Longest debounce window accepted.
    pub const MAX_MIN_INTERVAL: Duration = Duration::from_secs(10);

    /// Clamps `min_interval` to [`Self::MAX_MIN_INTERVAL`] and restores the
    /// default message if it was left empty.
    pub fn validated(mut self) -> Self {
        if self.min_interval > Self::MAX_MIN_INTERVAL {
            warn!(
                min_interval_ms = self.min_interval.as_millis(),
                max_ms = Self::MAX_MIN_INTERVAL.as_millis(),
                "guard min_interval exceeds maximum, clamping"
            );
            self.min_interval = Self::MAX_MIN_INTERVAL;
        }
        if self.login_required_message.trim().is_empty() {
            warn!("empty login_required_message, using the default");
            self.login_required_message = Self::default().login_required_message;
        }
        self
    }
}
