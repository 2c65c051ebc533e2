//! Proactive refresh: one timer per session, armed from the access
//! token's `exp`.
//!
//! # Lifecycle
//!
//! ```text
//! schedule(token) ──→ [armed] ──sleep(delay)──→ refresh_tokens()
//!       ↑                │                          │        │
//!       │             cancel()                    Ok(pair)  Err
//!       │                ↓                          │        ↓
//!       │             [idle] ←──────────────────────┼──── [idle]
//!       └───────────── schedule(pair.access_token) ─┘
//! ```
//!
//! Only one timer exists at a time: arming replaces (aborts) whatever was
//! pending. A failed proactive refresh is not retried here; the next API
//! call's 401 recovery in the interceptor takes over.
//!
//! # Ownership
//!
//! The spawned task holds only a weak reference to the scheduler while it
//! sleeps, so dropping the last [`RefreshScheduler`] handle aborts the
//! pending refresh instead of keeping it alive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use ketohelper_protocol::{decode_claims, now_epoch_secs};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::{RefreshConfig, TokenRefresher};

/// Shared handle to the refresh timer. Clones control the same timer.
pub struct RefreshScheduler<R> {
    inner: Arc<SchedulerInner<R>>,
}

impl<R> Clone for RefreshScheduler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SchedulerInner<R> {
    refresher: R,
    config: RefreshConfig,
    generation: AtomicU64,
    pending: Mutex<Option<Pending>>,
}

/// The armed timer. `generation` tells a finishing task whether the slot
/// still belongs to it or was replaced meanwhile.
struct Pending {
    generation: u64,
    handle: AbortHandle,
}

impl<R: TokenRefresher> RefreshScheduler<R> {
    pub fn new(refresher: R, config: RefreshConfig) -> Self {
        let config = config.validated();
        debug!(
            lead_secs = config.lead_time.as_secs(),
            "refresh scheduler created"
        );
        Self {
            inner: Arc::new(SchedulerInner {
                refresher,
                config,
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Arms the timer for `access_token`, replacing any pending refresh.
    ///
    /// Returns the delay until the refresh fires, or `None` (and nothing
    /// armed) when the token has no readable `exp` or no Tokio runtime is
    /// running.
    pub fn schedule(&self, access_token: &str) -> Option<Duration> {
        arm(&self.inner, access_token)
    }

    /// Disarms the timer. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancel() {
            debug!("scheduled refresh cancelled");
        }
    }

    /// `true` while a refresh is armed or in progress.
    pub fn is_scheduled(&self) -> bool {
        self.inner
            .lock_pending()
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.inner.config
    }

    pub fn refresher(&self) -> &R {
        &self.inner.refresher
    }
}

impl<R> SchedulerInner<R> {
    fn lock_pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) -> bool {
        match self.lock_pending().take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Clears the slot if it still holds `generation`, without aborting.
    fn release(&self, generation: u64) {
        let mut pending = self.lock_pending();
        if pending.as_ref().is_some_and(|p| p.generation == generation) {
            *pending = None;
        }
    }
}

impl<R> Drop for SchedulerInner<R> {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn arm<R: TokenRefresher>(inner: &Arc<SchedulerInner<R>>, access_token: &str) -> Option<Duration> {
    let Some(exp) = decode_claims(access_token).and_then(|claims| claims.exp) else {
        inner.cancel();
        debug!("token has no readable expiry, not scheduling a refresh");
        return None;
    };

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no tokio runtime, cannot schedule a refresh");
        return None;
    };

    let delay = inner.config.delay_until(exp, now_epoch_secs());
    let generation = inner.generation.fetch_add(1, Ordering::Relaxed) + 1;

    let mut pending = inner.lock_pending();
    if let Some(previous) = pending.take() {
        previous.handle.abort();
    }
    let task = runtime.spawn(run(Arc::downgrade(inner), generation, delay));
    *pending = Some(Pending {
        generation,
        handle: task.abort_handle(),
    });
    drop(pending);

    debug!(delay_secs = delay.as_secs(), generation, "refresh scheduled");
    Some(delay)
}

async fn run<R: TokenRefresher>(inner: Weak<SchedulerInner<R>>, generation: u64, delay: Duration) {
    tokio::time::sleep(delay).await;

    let Some(inner) = inner.upgrade() else {
        return;
    };

    let result = inner.refresher.refresh_tokens().await;
    inner.release(generation);

    match result {
        Ok(pair) => {
            info!(generation, "proactive refresh succeeded");
            arm(&inner, &pair.access_token);
        }
        Err(e) => {
            warn!(error = %e, "proactive refresh failed, waiting for the next 401");
        }
    }
}
