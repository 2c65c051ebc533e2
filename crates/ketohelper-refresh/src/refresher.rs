//! The refresh call itself: trade the stored refresh token for new tokens.

use std::sync::Arc;

use ketohelper_protocol::{RefreshRequest, TokenPair, endpoints};
use ketohelper_session::SessionStore;
use ketohelper_transport::{ApiRequest, HttpTransport};
use tracing::{debug, info, warn};

use crate::RefreshError;

/// Something that can obtain fresh tokens.
///
/// The route guard, the interceptor and the scheduler all refresh through
/// this trait, so tests can count or fail refreshes without a backend.
///
/// Implementations must leave the session untouched on failure.
pub trait TokenRefresher: Send + Sync + 'static {
    /// Obtains new tokens and installs them in the session store.
    ///
    /// # Errors
    /// See [`RefreshError`]. On any error the store is unchanged by the
    /// refresh; [`RefreshError::Superseded`] means someone else changed it.
    fn refresh_tokens(&self) -> impl Future<Output = Result<TokenPair, RefreshError>> + Send;
}

impl<R: TokenRefresher> TokenRefresher for Arc<R> {
    fn refresh_tokens(&self) -> impl Future<Output = Result<TokenPair, RefreshError>> + Send {
        (**self).refresh_tokens()
    }
}

/// [`TokenRefresher`] that calls `POST /auth/refresh`.
///
/// The request carries no bearer header: the refresh token in the body is
/// the only credential, and the expired access token would only get the
/// request rejected.
pub struct Refresher<T> {
    transport: T,
    store: SessionStore,
}

impl<T: HttpTransport> Refresher<T> {
    pub fn new(transport: T, store: SessionStore) -> Self {
        Self { transport, store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

impl<T: HttpTransport> TokenRefresher for Refresher<T> {
    async fn refresh_tokens(&self) -> Result<TokenPair, RefreshError> {
        let Some(refresh_token) = self.store.refresh_token() else {
            debug!("refresh skipped: no refresh token stored");
            return Err(RefreshError::MissingRefreshToken);
        };

        let request = ApiRequest::post(endpoints::REFRESH).json(&RefreshRequest {
            refresh_token: &refresh_token,
        })?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "token refresh rejected");
            return Err(RefreshError::Rejected(response.status));
        }

        let pair: TokenPair = response.parse()?;
        if pair.access_token.is_empty() {
            return Err(RefreshError::InvalidResponse(
                "empty access token".to_string(),
            ));
        }

        let rotated = pair.refresh_token.is_some();
        let installed = self.store.set_tokens_if_current(
            &refresh_token,
            pair.access_token.clone(),
            pair.refresh_token.clone(),
        );
        if !installed {
            info!("session changed during refresh, discarding tokens");
            return Err(RefreshError::Superseded);
        }
        info!(rotated, "tokens refreshed");

        Ok(pair)
    }
}
