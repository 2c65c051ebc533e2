//! Client configuration.
//!
//! Everything has a default, so `ClientConfig::default()` is a working
//! local-development setup. [`ClientConfig::from_env`] overlays the
//! handful of settings that differ per deployment.

use std::path::PathBuf;
use std::time::Duration;

use ketohelper_guard::{GuardConfig, RouteTable};
use ketohelper_refresh::RefreshConfig;
use ketohelper_session::StoreConfig;
use tracing::warn;

/// Environment variable names read by [`ClientConfig::from_env`].
pub mod env {
    /// Backend base URL, e.g. `https://api.ketohelper.app`.
    pub const API_BASE_URL: &str = "KETO_API_BASE_URL";
    /// Redirect URI registered with Naver for the code exchange.
    pub const NAVER_REDIRECT_URI: &str = "KETO_NAVER_REDIRECT_URI";
    /// Proactive refresh lead time, in whole seconds.
    pub const REFRESH_LEAD_SECS: &str = "KETO_REFRESH_LEAD_SECS";
    /// Directory for the persisted session. Unset keeps it in memory.
    pub const STATE_DIR: &str = "KETO_STATE_DIR";
}

/// Full configuration for an [`AuthClient`](crate::AuthClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every API path is joined onto.
    pub base_url: String,

    /// Total time allowed for one HTTP request.
    pub request_timeout: Duration,

    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,

    /// Redirect URI sent with the Naver code exchange. Naver login fails
    /// with [`KetoError::Config`](crate::KetoError::Config) without it.
    pub naver_redirect_uri: Option<String>,

    /// Where to persist the session. `None` keeps it in memory only.
    pub state_dir: Option<PathBuf>,

    pub refresh: RefreshConfig,
    pub guard: GuardConfig,
    pub store: StoreConfig,
    pub routes: RouteTable,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            naver_redirect_uri: None,
            state_dir: None,
            refresh: RefreshConfig::default(),
            guard: GuardConfig::default(),
            store: StoreConfig::default(),
            routes: RouteTable::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with the `KETO_*` environment variables.
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = var(env::API_BASE_URL) {
            config.base_url = url;
        }
        if let Some(uri) = var(env::NAVER_REDIRECT_URI) {
            config.naver_redirect_uri = Some(uri);
        }
        if let Some(raw) = var(env::REFRESH_LEAD_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.refresh.lead_time = Duration::from_secs(secs),
                Err(e) => warn!(
                    var = env::REFRESH_LEAD_SECS,
                    value = %raw,
                    error = %e,
                    "ignoring malformed refresh lead time"
                ),
            }
        }
        if let Some(dir) = var(env::STATE_DIR) {
            config.state_dir = Some(PathBuf::from(dir));
        }

        config.validated()
    }

    /// Clamps the nested configs and normalizes the base URL.
    pub fn validated(mut self) -> Self {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            warn!("empty base_url, using the default");
            self.base_url = Self::default().base_url;
        } else {
            self.base_url = trimmed.to_string();
        }
        self.refresh = self.refresh.validated();
        self.guard = self.guard.validated();
        self
    }
}
