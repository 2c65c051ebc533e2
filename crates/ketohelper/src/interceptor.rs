//! Authenticated API calls with single-flight 401 recovery.
//!
//! Every request goes out with the current access token. When one comes
//! back 401 the interceptor refreshes the tokens and replays the request
//! once. Concurrent 401s share one refresh:
//!
//! ```text
//!             401                    401 while refreshing
//!   [Idle] ─────────→ [Refreshing] ←──────────────────── caller queues
//!     ↑                    │                              as a waiter
//!     │    refresh done    │
//!     └────────────────────┘  waiters released with the outcome,
//!                             every caller retries once
//! ```
//!
//! A request that gets 401 again after its retry fails with
//! [`KetoError::Unauthorized`]; it is never retried twice. When the
//! refresh itself fails the session is cleared and every caller waiting
//! on it gets [`KetoError::SessionExpired`]. A refresh that lands after
//! the session was cleared or replaced is discarded and the newer session
//! is left alone.
//!
//! # Drop safety
//!
//! The caller leading a refresh holds a guard. If its future is dropped
//! mid-refresh the guard puts the coordinator back to `Idle` and tells the
//! waiters the refresh was abandoned. They go through recovery again and
//! one of them leads a new refresh; nobody is told the session expired.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ketohelper_guard::RouteTable;
use ketohelper_protocol::{TokenPair, UserPatch, decode_claims};
use ketohelper_refresh::{RefreshError, RefreshScheduler, TokenRefresher};
use ketohelper_session::SessionStore;
use ketohelper_transport::{ApiRequest, ApiResponse, HttpTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::KetoError;

/// Outcome handed to queued callers when a refresh ends.
#[derive(Debug, Clone)]
enum Released {
    /// Retry with this access token.
    Token(String),
    /// The refresh failed and the session is gone.
    Expired,
    /// The leading caller was dropped before the refresh finished.
    Abandoned,
}

type Waiter = oneshot::Sender<Released>;

enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

/// What a caller that just saw a 401 does next.
enum Recovery {
    Retry(String),
    Expired,
    Wait(oneshot::Receiver<Released>),
    Lead,
}

/// Sends API requests with bearer credentials and recovers from 401s.
pub struct AuthInterceptor<T, R> {
    transport: T,
    store: SessionStore,
    scheduler: RefreshScheduler<R>,
    routes: Arc<RouteTable>,
    state: Mutex<RefreshState>,
}

impl<T: HttpTransport, R: TokenRefresher> AuthInterceptor<T, R> {
    /// `scheduler` supplies the refresher and is re-armed after every
    /// successful recovery.
    pub fn new(
        transport: T,
        store: SessionStore,
        scheduler: RefreshScheduler<R>,
        routes: Arc<RouteTable>,
    ) -> Self {
        Self {
            transport,
            store,
            scheduler,
            routes,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Sends `request` with the current access token, recovering from one
    /// 401.
    ///
    /// Statuses other than 401 are returned as-is; interpreting them is up
    /// to the caller.
    ///
    /// # Errors
    /// - [`KetoError::Transport`] if no response was obtained
    /// - [`KetoError::SessionExpired`] if the refresh failed
    /// - [`KetoError::Unauthorized`] if the retry got 401 again
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, KetoError> {
        let sent_token = self.store.access_token();
        let response = self
            .transport
            .send(request.clone().with_bearer(sent_token.clone()))
            .await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(id = %request.id, path = %request.path, "401, recovering");
        let token = self.recover(sent_token.as_deref()).await?;

        let retry = self.transport.send(request.clone().with_bearer(Some(token))).await?;
        if retry.is_unauthorized() {
            warn!(id = %request.id, path = %request.path, "401 again after refresh");
            return Err(KetoError::Unauthorized);
        }
        Ok(retry)
    }

    /// `GET path`, parsing a 2xx body as `D`.
    ///
    /// # Errors
    /// As [`execute`](Self::execute), plus [`KetoError::Status`] for any
    /// other non-2xx status and [`KetoError::Transport`] if the body
    /// doesn't parse.
    pub async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D, KetoError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        Ok(expect_success(response)?.parse()?)
    }

    /// `POST path` with a JSON body, parsing a 2xx body as `D`.
    ///
    /// # Errors
    /// As [`get_json`](Self::get_json).
    pub async fn post_json<B, D>(&self, path: &str, body: &B) -> Result<D, KetoError>
    where
        B: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        let request = ApiRequest::post(path).json(body)?;
        let response = self.execute(request).await?;
        Ok(expect_success(response)?.parse()?)
    }

    /// `DELETE path`, ignoring any response body.
    ///
    /// # Errors
    /// As [`execute`](Self::execute), plus [`KetoError::Status`].
    pub async fn delete(&self, path: &str) -> Result<(), KetoError> {
        let response = self.execute(ApiRequest::delete(path)).await?;
        expect_success(response)?;
        Ok(())
    }

    /// `true` while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler<R> {
        &self.scheduler
    }

    // -- Recovery ---------------------------------------------------------

    /// Obtains a token worth retrying with after a 401 on `sent_token`.
    async fn recover(&self, sent_token: Option<&str>) -> Result<String, KetoError> {
        loop {
            match self.next_recovery(sent_token) {
                Recovery::Retry(token) => {
                    debug!("token already replaced, retrying without refresh");
                    return Ok(token);
                }
                Recovery::Expired => return Err(KetoError::SessionExpired),
                Recovery::Wait(rx) => match rx.await {
                    Ok(Released::Token(token)) => return Ok(token),
                    Ok(Released::Expired) => return Err(KetoError::SessionExpired),
                    Ok(Released::Abandoned) | Err(_) => {
                        debug!("refresh leader went away, recovering again");
                    }
                },
                Recovery::Lead => return self.lead_refresh().await,
            }
        }
    }

    /// Decides under the state lock, so two callers can't both lead.
    fn next_recovery(&self, sent_token: Option<&str>) -> Recovery {
        let mut state = self.lock_state();
        match &mut *state {
            RefreshState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                debug!(queued = waiters.len(), "refresh in flight, queueing");
                Recovery::Wait(rx)
            }
            RefreshState::Idle => match (self.store.access_token(), sent_token) {
                // Refreshed by someone else while our request was in flight.
                (Some(current), Some(sent)) if current != sent => Recovery::Retry(current),
                // Signed in while our anonymous request was in flight.
                (Some(current), None) => Recovery::Retry(current),
                // Cleared by someone else while our request was in flight.
                (None, Some(_)) => Recovery::Expired,
                _ => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    Recovery::Lead
                }
            },
        }
    }

    async fn lead_refresh(&self) -> Result<String, KetoError> {
        let leader = LeaderGuard {
            state: &self.state,
            released: false,
        };
        let outcome = match self.scheduler.refresher().refresh_tokens().await {
            Ok(pair) => {
                self.on_refreshed(&pair);
                Released::Token(pair.access_token)
            }
            Err(RefreshError::Superseded) => {
                // Whoever changed the session owns it now.
                debug!("session changed during refresh, keeping it");
                match (self.store.user(), self.store.access_token()) {
                    (Some(_), Some(token)) => Released::Token(token),
                    _ => Released::Expired,
                }
            }
            Err(e) => {
                warn!(error = %e, "refresh after 401 failed, ending session");
                self.on_refresh_failed();
                Released::Expired
            }
        };
        leader.release(outcome.clone());

        match outcome {
            Released::Token(token) => Ok(token),
            Released::Expired | Released::Abandoned => Err(KetoError::SessionExpired),
        }
    }

    fn on_refreshed(&self, pair: &TokenPair) {
        // A rotated refresh token means the backend reissued the identity
        // claims too; pick up name or email changes.
        if pair.refresh_token.is_some() {
            if let Some(claims) = decode_claims(&pair.access_token) {
                let patch = UserPatch::from_claims(&claims);
                if !patch.is_empty() && self.store.update_user(&patch) {
                    debug!("user updated from refreshed claims");
                }
            }
        }
        self.scheduler.schedule(&pair.access_token);
        info!("session recovered after 401");
    }

    fn on_refresh_failed(&self) {
        let current = self.store.navigator().current_path();
        let redirect = self.routes.is_protected(&current);
        self.scheduler.cancel();
        self.store.clear(redirect);
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets the coordinator when the leading caller finishes or is dropped.
struct LeaderGuard<'a> {
    state: &'a Mutex<RefreshState>,
    released: bool,
}

impl LeaderGuard<'_> {
    fn release(mut self, outcome: Released) {
        self.released = true;
        self.finish(outcome);
    }

    fn finish(&self, outcome: Released) {
        let previous = std::mem::replace(
            &mut *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            RefreshState::Idle,
        );
        if let RefreshState::Refreshing { waiters } = previous {
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            debug!("refresh leader dropped, releasing waiters");
            self.finish(Released::Abandoned);
        }
    }
}

fn expect_success(response: ApiResponse) -> Result<ApiResponse, KetoError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(KetoError::Status(response.status))
    }
}
