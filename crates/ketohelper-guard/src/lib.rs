//! Navigation guard for KetoHelper.
//!
//! Every route has a sensitivity ([`RoutePolicy`]): some pages are useless
//! without a session, some only need one for their actions, and the rest
//! are public. On each navigation the [`RouteGuard`] checks the session,
//! tries one silent refresh if it has lapsed, and otherwise reacts
//! according to the page's policy: redirect home, open the login prompt,
//! or let anonymous browsing continue.
//!
//! # Key types
//!
//! - [`RouteGuard`]: the per-navigation decision
//! - [`RouteTable`]: prefix → policy classification
//! - [`LoginPrompt`] / [`Notifier`]: the UI hooks the guard drives
//! - [`GuardOutcome`]: what the guard did, for callers and tests

mod config;
mod guard;
mod hooks;

pub use config::{GuardConfig, RoutePolicy, RouteTable, route_path};
pub use guard::{GuardOutcome, RouteGuard, SkipReason};
pub use hooks::{HeadlessPrompt, LogNotifier, LoginPrompt, Notifier};
