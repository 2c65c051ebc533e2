//! Token refresh for KetoHelper.
//!
//! Access tokens are short-lived. This crate keeps them fresh two ways:
//!
//! - **On demand**: [`Refresher`] trades the stored refresh token for a new
//!   pair via `POST /auth/refresh`. The interceptor calls it after a 401 and
//!   the route guard calls it before giving up on a protected page.
//! - **Proactively**: [`RefreshScheduler`] reads the access token's `exp`
//!   and refreshes `lead_time` (60 s by default) before it, so most API
//!   calls never see a 401 at all.
//!
//! Both go through the [`TokenRefresher`] trait, which is also the seam
//! tests use to count or fail refreshes.
//!
//! # Integration
//!
//! ```ignore
//! let refresher = Arc::new(Refresher::new(transport, store.clone()));
//! let scheduler = RefreshScheduler::new(refresher.clone(), RefreshConfig::default());
//!
//! // After login or rehydration:
//! if let Some(token) = store.access_token() {
//!     scheduler.schedule(&token);
//! }
//! ```
//!
//! # Clock
//!
//! Token expiry is wall-clock, the timer is Tokio's. The delay is computed
//! once from wall-clock time when the timer is armed; a system clock jump
//! while it sleeps shifts the refresh by the same amount, and a 401 covers
//! the worst case.

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod refresher;
mod scheduler;

pub use config::RefreshConfig;
pub use error::RefreshError;
pub use refresher::{Refresher, TokenRefresher};
pub use scheduler::RefreshScheduler;
