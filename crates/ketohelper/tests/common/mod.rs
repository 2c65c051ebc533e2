//! A scripted KetoHelper backend for integration tests.
//!
//! API paths answer 200 only to the currently valid access token and 401
//! to anything else. The auth endpoints behave like the real ones, with
//! knobs for failures and latency.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ketohelper::guard::HeadlessPrompt;
use ketohelper::protocol::testing::token_with_claims;
use ketohelper::protocol::{User, now_epoch_secs};
use ketohelper::session::HeadlessNavigator;
use ketohelper::transport::{ApiRequest, ApiResponse, HttpTransport, TransportError};
use ketohelper::{AuthClient, AuthClientBuilder, ClientConfig};
use serde_json::json;

/// Provider credential the login endpoints accept.
pub const PROVIDER_TOKEN: &str = "provider-ok";

/// A distinct token for `tag`, valid for `secs` seconds.
pub fn token(tag: &str, secs: i64) -> String {
    token_with_claims(&json!({ "jti": tag, "exp": now_epoch_secs() + secs }))
}

/// A distinct hour-long token carrying identity claims.
pub fn token_with_identity(tag: &str, name: &str, email: &str) -> String {
    token_with_claims(&json!({
        "jti": tag,
        "exp": now_epoch_secs() + 3_600,
        "name": name,
        "email": email,
    }))
}

pub fn user() -> User {
    User {
        id: "u1".into(),
        email: "keto@example.com".into(),
        name: "Keto".into(),
        profile_image: None,
    }
}

// =========================================================================
// MockBackend
// =========================================================================

/// How `/auth/refresh` answers.
#[derive(Clone)]
pub enum RefreshReply {
    /// 200 with this access token and optionally a rotated refresh token.
    Issue {
        access_token: String,
        refresh_token: Option<String>,
    },
    /// This status with an error body.
    Fail(u16),
}

pub struct MockBackend {
    /// The only bearer token API paths accept.
    pub valid_token: Mutex<Option<String>>,
    pub refresh_reply: RefreshReply,
    /// Whether a refreshed token becomes the valid one.
    pub accept_refreshed: bool,
    pub refresh_delay: Duration,
    /// Latency of API paths, applied before the token is checked.
    pub api_delay: Duration,
    /// Status `/auth/logout` answers with.
    pub logout_status: u16,
    pub refresh_calls: AtomicUsize,
    pub requests: Mutex<Vec<ApiRequest>>,
}

impl MockBackend {
    pub fn new(refresh_reply: RefreshReply) -> Self {
        let valid_token = match &refresh_reply {
            RefreshReply::Issue { access_token, .. } => Some(access_token.clone()),
            RefreshReply::Fail(_) => None,
        };
        Self {
            valid_token: Mutex::new(valid_token),
            refresh_reply,
            accept_refreshed: true,
            refresh_delay: Duration::from_millis(100),
            api_delay: Duration::ZERO,
            logout_status: 200,
            refresh_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose refresh endpoint always fails with 401.
    pub fn refusing() -> Self {
        Self::new(RefreshReply::Fail(401))
    }

    /// A backend whose refresh endpoint issues `access_token` and keeps the
    /// refresh token.
    pub fn issuing(access_token: &str) -> Self {
        Self::new(RefreshReply::Issue {
            access_token: access_token.to_string(),
            refresh_token: None,
        })
    }

    pub fn accept(&self, token: &str) {
        *self.valid_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn login_reply(&self, request: &ApiRequest) -> ApiResponse {
        let provided = request
            .body
            .as_ref()
            .and_then(|b| b.get("access_token").or_else(|| b.get("code")))
            .and_then(|v| v.as_str());
        if provided != Some(PROVIDER_TOKEN) {
            return ApiResponse::json(401, &json!({ "message": "invalid provider token" }));
        }
        let access_token = token("login", 3_600);
        self.accept(&access_token);
        ApiResponse::json(
            200,
            &json!({
                "user": { "id": 1, "email": "keto@example.com", "name": "Keto" },
                "accessToken": access_token,
                "refreshToken": "refresh-1",
            }),
        )
    }

    async fn answer_refresh(&self) -> ApiResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.refresh_delay).await;
        match &self.refresh_reply {
            RefreshReply::Issue {
                access_token,
                refresh_token,
            } => {
                if self.accept_refreshed {
                    self.accept(access_token);
                }
                ApiResponse::json(
                    200,
                    &json!({ "accessToken": access_token, "refreshToken": refresh_token }),
                )
            }
            RefreshReply::Fail(status) => {
                ApiResponse::json(*status, &json!({ "message": "refresh token expired" }))
            }
        }
    }
}

impl HttpTransport for MockBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let response = match request.path.as_str() {
            "/auth/refresh" => self.answer_refresh().await,
            "/auth/google" | "/auth/kakao" | "/auth/naver" => self.login_reply(&request),
            "/auth/logout" => ApiResponse::json(self.logout_status, &json!({})),
            "/api/broken" => ApiResponse::json(500, &json!({ "message": "boom" })),
            path => {
                if !self.api_delay.is_zero() {
                    tokio::time::sleep(self.api_delay).await;
                }
                let valid = self.valid_token.lock().unwrap().clone();
                if valid.is_some() && request.bearer == valid {
                    ApiResponse::json(200, &json!({ "path": path }))
                } else {
                    ApiResponse::json(401, &json!({ "message": "unauthorized" }))
                }
            }
        };
        Ok(response)
    }
}

// =========================================================================
// Client harness
// =========================================================================

pub struct Harness {
    pub client: AuthClient<MockBackend>,
    pub nav: Arc<HeadlessNavigator>,
    pub prompt: Arc<HeadlessPrompt>,
}

impl Harness {
    /// A client over `backend` with default config, displaying `path`.
    pub fn at(path: &str, backend: MockBackend) -> Self {
        Self::with_config(path, backend, ClientConfig::default())
    }

    pub fn with_config(path: &str, backend: MockBackend, config: ClientConfig) -> Self {
        let nav = Arc::new(HeadlessNavigator::at(path));
        let prompt = Arc::new(HeadlessPrompt::new());
        let client = AuthClientBuilder::new()
            .config(config)
            .navigator(nav.clone())
            .login_prompt(prompt.clone())
            .build(backend)
            .expect("client builds");
        Self {
            client,
            nav,
            prompt,
        }
    }

    pub fn backend(&self) -> &MockBackend {
        self.client.transport()
    }

    /// Installs a signed-in session holding `access_token` and
    /// `refresh-1`, without arming the refresh timer.
    pub fn sign_in(&self, access_token: &str) {
        self.client
            .store()
            .set_auth(user(), access_token.to_string(), "refresh-1".to_string());
    }
}
