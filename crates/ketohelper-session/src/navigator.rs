//! Navigation hook for moving the app between routes.
//!
//! The session layer doesn't render anything and doesn't own a router.
//! It only needs two things from whatever does: "where is the user right
//! now?" and "send them here". [`Navigator`] is that seam. A browser shell
//! implements it over its router; the [`HeadlessNavigator`] here keeps an
//! in-memory path for CLIs, demos, and tests.

use std::sync::Mutex;

/// The application root, where unauthenticated users are sent from
/// protected pages.
pub const ROOT_PATH: &str = "/";

/// Reads and changes the currently displayed route.
///
/// - `Send + Sync` → shared by the store, the guard, and the interceptor,
///   any of which may run on a Tokio worker thread.
/// - Methods are synchronous: navigation is a UI state change, not I/O.
pub trait Navigator: Send + Sync + 'static {
    /// The path currently displayed (e.g. `/calendar`).
    fn current_path(&self) -> String;

    /// Replaces the displayed route with `path`.
    fn navigate(&self, path: &str);
}

/// A [`Navigator`] with no UI behind it: it records the current path and
/// every navigation.
#[derive(Debug)]
pub struct HeadlessNavigator {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl HeadlessNavigator {
    /// Starts at `path` with an empty history.
    pub fn at(path: &str) -> Self {
        Self {
            current: Mutex::new(path.to_string()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every path passed to [`Navigator::navigate`], oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Moves to `path` without recording it, as a user clicking a link
    /// would before the guard runs.
    pub fn visit(&self, path: &str) {
        *self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = path.to_string();
    }
}

impl Default for HeadlessNavigator {
    fn default() -> Self {
        Self::at(ROOT_PATH)
    }
}

impl Navigator for HeadlessNavigator {
    fn current_path(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigating");
        self.visit(path);
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(path.to_string());
    }
}
