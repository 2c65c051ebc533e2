//! Integration tests for the proactive refresh scheduler.
//!
//! Tokio time is paused and auto-advances, so a sleep of minutes resolves
//! instantly. Token expiry is read from the real wall clock, which does
//! not move during a test, so delays computed at `schedule` time are
//! exact up to the second.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ketohelper_protocol::testing::token_expiring_in;
use ketohelper_protocol::{TokenPair, User};
use ketohelper_refresh::{RefreshConfig, RefreshError, RefreshScheduler, Refresher, TokenRefresher};
use ketohelper_session::SessionStore;
use ketohelper_transport::{ApiRequest, ApiResponse, HttpTransport, TransportError};

// =========================================================================
// Helpers
// =========================================================================

/// Counts calls and answers with whatever `outcome` produces.
struct CountingRefresher {
    calls: AtomicUsize,
    outcome: Box<dyn Fn() -> Result<TokenPair, RefreshError> + Send + Sync>,
}

impl CountingRefresher {
    fn new(outcome: impl Fn() -> Result<TokenPair, RefreshError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Box::new(outcome),
        })
    }

    /// Always fails, so a fired timer never re-arms.
    fn failing() -> Arc<Self> {
        Self::new(|| Err(RefreshError::Rejected(401)))
    }

    /// Always succeeds with a token valid for `secs`.
    fn issuing(secs: i64) -> Arc<Self> {
        Self::new(move || {
            Ok(TokenPair {
                access_token: token_expiring_in(secs),
                refresh_token: None,
            })
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenRefresher for CountingRefresher {
    async fn refresh_tokens(&self) -> Result<TokenPair, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)()
    }
}

fn scheduler(refresher: &Arc<CountingRefresher>) -> RefreshScheduler<Arc<CountingRefresher>> {
    RefreshScheduler::new(Arc::clone(refresher), RefreshConfig::default())
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

// =========================================================================
// Delay computation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_schedule_token_inside_lead_window_refreshes_immediately() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);

    let delay = scheduler.schedule(&token_expiring_in(30));

    assert_eq!(delay, Some(Duration::ZERO));
    advance(1).await;
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_far_expiry_fires_lead_time_before_exp() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);

    let delay = scheduler.schedule(&token_expiring_in(600)).unwrap();

    assert!(
        (539..=540).contains(&delay.as_secs()),
        "expected ~540s, got {delay:?}"
    );
    advance(530).await;
    assert_eq!(refresher.calls(), 0, "must not fire early");
    assert!(scheduler.is_scheduled());

    advance(20).await;
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_expired_token_refreshes_immediately() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);

    assert_eq!(scheduler.schedule(&token_expiring_in(-120)), Some(Duration::ZERO));
    advance(1).await;

    assert_eq!(refresher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_custom_lead_time() {
    let refresher = CountingRefresher::failing();
    let scheduler = RefreshScheduler::new(
        Arc::clone(&refresher),
        RefreshConfig::with_lead_time(Duration::from_secs(10)),
    );

    let delay = scheduler.schedule(&token_expiring_in(30)).unwrap();

    assert!((19..=20).contains(&delay.as_secs()));
}

// =========================================================================
// Undecodable tokens
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_schedule_opaque_token_schedules_nothing() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);

    assert_eq!(scheduler.schedule("opaque-session-token"), None);
    assert!(!scheduler.is_scheduled());

    advance(3_600).await;
    assert_eq!(refresher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_opaque_token_cancels_previous_timer() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);
    scheduler.schedule(&token_expiring_in(120));

    scheduler.schedule("not.a-jwt");

    advance(3_600).await;
    assert_eq!(refresher.calls(), 0);
}

// =========================================================================
// Replacement and cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_schedule_twice_only_latest_fires() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);

    scheduler.schedule(&token_expiring_in(120));
    scheduler.schedule(&token_expiring_in(600));

    advance(120).await;
    assert_eq!(refresher.calls(), 0, "first timer was replaced");

    advance(480).await;
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_refresh() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);
    scheduler.schedule(&token_expiring_in(120));

    scheduler.cancel();
    scheduler.cancel();

    assert!(!scheduler.is_scheduled());
    advance(3_600).await;
    assert_eq!(refresher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_handle_aborts_timer() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);
    let clone = scheduler.clone();
    scheduler.schedule(&token_expiring_in(120));

    drop(scheduler);
    assert!(clone.is_scheduled(), "a live clone keeps the timer");
    drop(clone);

    advance(3_600).await;
    assert_eq!(refresher.calls(), 0);
}

// =========================================================================
// After firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_successful_refresh_rearms_for_new_token() {
    let refresher = CountingRefresher::issuing(120);
    let scheduler = scheduler(&refresher);

    scheduler.schedule(&token_expiring_in(30));
    advance(1).await;
    assert_eq!(refresher.calls(), 1);
    assert!(scheduler.is_scheduled(), "re-armed for the new token");

    advance(61).await;
    assert_eq!(refresher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_stops_scheduling() {
    let refresher = CountingRefresher::failing();
    let scheduler = scheduler(&refresher);

    scheduler.schedule(&token_expiring_in(30));
    advance(1).await;

    assert_eq!(refresher.calls(), 1);
    assert!(!scheduler.is_scheduled());
    advance(3_600).await;
    assert_eq!(refresher.calls(), 1, "no retry after failure");
}

// =========================================================================
// With the real refresher
// =========================================================================

struct RefreshEndpoint {
    status: u16,
    access_token: String,
    requests: Mutex<Vec<ApiRequest>>,
}

impl HttpTransport for RefreshEndpoint {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        Ok(ApiResponse::json(
            self.status,
            &serde_json::json!({ "accessToken": self.access_token, "refreshToken": "r2" }),
        ))
    }
}

fn signed_in_store(access_token: &str) -> SessionStore {
    let store = SessionStore::in_memory();
    store.set_auth(
        User {
            id: "u1".into(),
            email: "keto@example.com".into(),
            name: "Keto".into(),
            profile_image: None,
        },
        access_token.into(),
        "r1".into(),
    );
    store
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_refresh_updates_store() {
    let old = token_expiring_in(30);
    let new = token_expiring_in(3_600);
    let store = signed_in_store(&old);
    let endpoint = Arc::new(RefreshEndpoint {
        status: 200,
        access_token: new.clone(),
        requests: Mutex::new(Vec::new()),
    });
    let scheduler = RefreshScheduler::new(
        Refresher::new(Arc::clone(&endpoint), store.clone()),
        RefreshConfig::default(),
    );

    scheduler.schedule(&old);
    advance(1).await;

    assert_eq!(store.access_token(), Some(new));
    assert_eq!(store.refresh_token().as_deref(), Some("r2"));
    assert_eq!(endpoint.requests.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_refresh_failure_leaves_store_untouched() {
    let old = token_expiring_in(30);
    let store = signed_in_store(&old);
    let before = store.snapshot();
    let endpoint = Arc::new(RefreshEndpoint {
        status: 401,
        access_token: String::new(),
        requests: Mutex::new(Vec::new()),
    });
    let scheduler = RefreshScheduler::new(
        Refresher::new(Arc::clone(&endpoint), store.clone()),
        RefreshConfig::default(),
    );

    scheduler.schedule(&old);
    advance(1).await;

    assert_eq!(store.snapshot(), before);
    assert!(!scheduler.is_scheduled());
}
