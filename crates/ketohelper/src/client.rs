//! `AuthClient`: the assembled auth stack behind one handle.
//!
//! Ties the layers together (transport, session store, refresher,
//! scheduler, interceptor, and route guard) and adds the flows that
//! span several of them: social login, logout, and navigation.
//!
//! ```text
//!   login(provider, token) ──→ POST /auth/{provider} ──→ store.set_auth
//!                                                       scheduler.schedule
//!                                                       prompt.close
//!
//!   logout() ──→ begin_logout ──→ POST /auth/logout ──→ cancel timer
//!                                  (failure ignored)    clear(protected?)
//!                                                       finish_logout
//! ```

use std::sync::Arc;

use ketohelper_guard::{
    GuardOutcome, HeadlessPrompt, LogNotifier, LoginPrompt, Notifier, RouteGuard, RouteTable,
};
use ketohelper_protocol::{
    AuthResponse, NaverLoginRequest, Provider, ProtocolError, SocialLoginRequest, User, endpoints,
};
use ketohelper_refresh::{RefreshScheduler, Refresher};
use ketohelper_session::{
    FileStorage, HeadlessNavigator, MemoryStorage, Navigator, SessionStore, Storage,
};
use ketohelper_transport::{ApiRequest, HttpTransport};
use rand::Rng;
use tracing::{info, warn};

use crate::{AuthInterceptor, ClientConfig, KetoError};

/// The refresher every component of a client shares.
pub type SharedRefresher<T> = Arc<Refresher<Arc<T>>>;

/// Interceptor type of an [`AuthClient`] over transport `T`.
pub type ClientInterceptor<T> = AuthInterceptor<Arc<T>, SharedRefresher<T>>;

/// Route guard type of an [`AuthClient`] over transport `T`.
pub type ClientGuard<T> = RouteGuard<SharedRefresher<T>>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring an [`AuthClient`].
///
/// Every hook is optional: without a storage the session lives in memory
/// (or in `config.state_dir` when set), without a navigator a
/// [`HeadlessNavigator`] is used, and without UI hooks the login prompt is
/// headless and toasts go to the log.
///
/// # Example
///
/// ```rust,ignore
/// let client = AuthClient::builder()
///     .config(ClientConfig::from_env())
///     .navigator(router.clone())
///     .login_prompt(modal.clone())
///     .connect()?;
/// ```
pub struct AuthClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn Storage>>,
    navigator: Option<Arc<dyn Navigator>>,
    prompt: Option<Arc<dyn LoginPrompt>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl AuthClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            storage: None,
            navigator: None,
            prompt: None,
            notifier: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn login_prompt(mut self, prompt: Arc<dyn LoginPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Builds the client over `transport`.
    ///
    /// Loads the persisted session, makes sure a guest id exists, and arms
    /// the refresh timer if a token was restored (when called inside a
    /// Tokio runtime).
    ///
    /// # Errors
    /// [`KetoError::Session`] if `config.state_dir` is set but can't be
    /// created.
    pub fn build<T: HttpTransport>(self, transport: T) -> Result<AuthClient<T>, KetoError> {
        let config = self.config.validated();

        let storage: Arc<dyn Storage> = match (self.storage, &config.state_dir) {
            (Some(storage), _) => storage,
            (None, Some(dir)) => Arc::new(FileStorage::open(dir)?),
            (None, None) => Arc::new(MemoryStorage::new()),
        };
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(HeadlessNavigator::default()) as Arc<dyn Navigator>);
        let prompt = self
            .prompt
            .unwrap_or_else(|| Arc::new(HeadlessPrompt::new()) as Arc<dyn LoginPrompt>);
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(LogNotifier) as Arc<dyn Notifier>);

        let store = SessionStore::load(storage, navigator, config.store.clone());
        store.ensure_guest_id();

        let transport = Arc::new(transport);
        let routes = Arc::new(config.routes.clone());
        let refresher = Arc::new(Refresher::new(Arc::clone(&transport), store.clone()));
        let scheduler = RefreshScheduler::new(Arc::clone(&refresher), config.refresh.clone());
        let interceptor = Arc::new(AuthInterceptor::new(
            Arc::clone(&transport),
            store.clone(),
            scheduler.clone(),
            Arc::clone(&routes),
        ));
        let guard = Arc::new(RouteGuard::new(
            store.clone(),
            refresher,
            routes,
            config.guard.clone(),
            Arc::clone(&prompt),
            notifier,
        ));

        if let Some(token) = store.access_token() {
            scheduler.schedule(&token);
        }
        info!(
            base_url = %config.base_url,
            signed_in = store.user().is_some(),
            "auth client ready"
        );

        Ok(AuthClient {
            transport,
            store,
            scheduler,
            interceptor,
            guard,
            prompt,
            config,
        })
    }

    /// Builds the client over a [`ReqwestTransport`] pointed at
    /// `config.base_url` with the configured timeouts.
    ///
    /// # Errors
    /// [`KetoError::Transport`] if the HTTP client can't be built, or as
    /// [`build`](Self::build).
    ///
    /// [`ReqwestTransport`]: ketohelper_transport::ReqwestTransport
    pub fn connect(self) -> Result<AuthClient<ketohelper_transport::ReqwestTransport>, KetoError> {
        let transport = ketohelper_transport::ReqwestTransport::with_timeouts(
            &self.config.base_url,
            self.config.request_timeout,
            self.config.connect_timeout,
        )?;
        self.build(transport)
    }
}

impl Default for AuthClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AuthClient
// ---------------------------------------------------------------------------

/// The assembled client. Share it behind an `Arc`; all methods take `&self`.
pub struct AuthClient<T: HttpTransport> {
    transport: Arc<T>,
    store: SessionStore,
    scheduler: RefreshScheduler<SharedRefresher<T>>,
    interceptor: Arc<ClientInterceptor<T>>,
    guard: Arc<ClientGuard<T>>,
    prompt: Arc<dyn LoginPrompt>,
    config: ClientConfig,
}

impl AuthClient<ketohelper_transport::ReqwestTransport> {
    /// Creates a new builder.
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::new()
    }
}

impl<T: HttpTransport> AuthClient<T> {
    // -- Login / logout ---------------------------------------------------

    /// Logs in with an access token issued by Google or Kakao.
    ///
    /// # Errors
    /// - [`KetoError::Protocol`] for [`Provider::Naver`] (use
    ///   [`login_naver`](Self::login_naver)) or a malformed response
    /// - [`KetoError::Status`] if the backend rejects the token
    /// - [`KetoError::Transport`] if the request fails
    pub async fn login(&self, provider: Provider, access_token: &str) -> Result<User, KetoError> {
        if provider == Provider::Naver {
            return Err(ProtocolError::InvalidMessage(
                "naver login exchanges an authorization code, use login_naver".to_string(),
            )
            .into());
        }
        let request =
            ApiRequest::post(provider.login_path()).json(&SocialLoginRequest { access_token })?;
        self.complete_login(provider, request).await
    }

    /// Logs in by exchanging a Naver authorization code.
    ///
    /// `state` must be the value generated by
    /// [`new_oauth_state`](Self::new_oauth_state) for this attempt.
    ///
    /// # Errors
    /// [`KetoError::Config`] if no Naver redirect URI is configured,
    /// otherwise as [`login`](Self::login).
    pub async fn login_naver(&self, code: &str, state: &str) -> Result<User, KetoError> {
        let Some(redirect_uri) = self.config.naver_redirect_uri.as_deref() else {
            return Err(KetoError::Config(
                "naver_redirect_uri is not configured".to_string(),
            ));
        };
        let request = ApiRequest::post(endpoints::NAVER_LOGIN).json(&NaverLoginRequest {
            code,
            state,
            redirect_uri,
        })?;
        self.complete_login(Provider::Naver, request).await
    }

    /// A fresh CSRF `state` for an OAuth redirect: 32 lowercase hex chars.
    pub fn new_oauth_state() -> String {
        let bytes: [u8; 16] = rand::rng().random();
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Logs out.
    ///
    /// Tells the backend (a failure there is logged, not returned), then
    /// clears the local session. The user is sent to `/` only if they are
    /// on a protected page. The route guard stands down for the duration
    /// and the next "login required" toast is suppressed.
    pub async fn logout(&self) {
        self.store.begin_logout();

        match self.interceptor.execute(ApiRequest::post(endpoints::LOGOUT)).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => warn!(status = response.status, "logout rejected by backend"),
            Err(e) => warn!(error = %e, "logout request failed"),
        }

        self.scheduler.cancel();
        let current = self.store.navigator().current_path();
        self.store.clear(self.config.routes.is_protected(&current));
        self.store.finish_logout();
        info!("logged out");
    }

    // -- Navigation -------------------------------------------------------

    /// Runs the route guard for a navigation to `path`.
    ///
    /// A session restored by the guard's silent refresh gets its refresh
    /// timer re-armed here.
    pub async fn on_navigate(&self, path: &str) -> GuardOutcome {
        let outcome = self.guard.on_navigate(path).await;
        if outcome == GuardOutcome::Refreshed {
            if let Some(token) = self.store.access_token() {
                self.scheduler.schedule(&token);
            }
        }
        outcome
    }

    /// Forwards a dismissed login prompt to the route guard.
    pub fn on_login_prompt_dismissed(&self) -> bool {
        self.guard.on_login_prompt_dismissed()
    }

    // -- Accessors --------------------------------------------------------

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn interceptor(&self) -> &Arc<ClientInterceptor<T>> {
        &self.interceptor
    }

    pub fn guard(&self) -> &Arc<ClientGuard<T>> {
        &self.guard
    }

    pub fn scheduler(&self) -> &RefreshScheduler<SharedRefresher<T>> {
        &self.scheduler
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.config.routes
    }

    async fn complete_login(&self, provider: Provider, request: ApiRequest) -> Result<User, KetoError> {
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!(%provider, status = response.status, "login rejected");
            return Err(KetoError::Status(response.status));
        }

        let auth: AuthResponse = response.parse()?;
        auth.validate()?;

        let user = auth.user.clone();
        self.store
            .set_auth(auth.user, auth.access_token.clone(), auth.refresh_token);
        self.scheduler.schedule(&auth.access_token);
        self.prompt.close();
        info!(%provider, user_id = %user.id, "logged in");

        Ok(user)
    }
}
