//! UI hooks the guard drives: the login prompt and toast notifications.
//!
//! The guard never renders anything. It asks the UI layer to open or close
//! a login prompt and to show a short message, through these two traits.
//! Both are synchronous: they flip UI state and return.

use std::sync::atomic::{AtomicBool, Ordering};

/// The login modal.
pub trait LoginPrompt: Send + Sync + 'static {
    /// Whether the prompt is currently shown.
    fn is_open(&self) -> bool;

    /// Shows the prompt. Opening an open prompt is a no-op.
    fn open(&self);

    /// Hides the prompt. Closing a closed prompt is a no-op.
    fn close(&self);
}

/// Short, transient user-facing messages.
pub trait Notifier: Send + Sync + 'static {
    fn toast(&self, message: &str);
}

/// A [`LoginPrompt`] with no UI: just an open/closed flag.
#[derive(Debug, Default)]
pub struct HeadlessPrompt {
    open: AtomicBool,
}

impl HeadlessPrompt {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoginPrompt for HeadlessPrompt {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn open(&self) {
        if !self.open.swap(true, Ordering::AcqRel) {
            tracing::debug!("login prompt opened");
        }
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::debug!("login prompt closed");
        }
    }
}

/// A [`Notifier`] that writes toasts to the log at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, message: &str) {
        tracing::info!(message, "toast");
    }
}
