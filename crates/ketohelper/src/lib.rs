//! # KetoHelper
//!
//! Client-side session lifecycle for the KetoHelper diet app.
//!
//! The workspace splits the problem into layers; this meta-crate
//! re-exports them and assembles them into an [`AuthClient`]:
//!
//! ```text
//! AuthClient ── login / logout / navigation flows
//!   ├─ AuthInterceptor   bearer tokens + single-flight 401 recovery
//!   ├─ RouteGuard        per-navigation session check   (ketohelper-guard)
//!   ├─ RefreshScheduler  refresh ahead of expiry        (ketohelper-refresh)
//!   ├─ SessionStore      user, tokens, guest id         (ketohelper-session)
//!   └─ HttpTransport     reqwest by default             (ketohelper-transport)
//!                        wire types + token claims      (ketohelper-protocol)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ketohelper::prelude::*;
//!
//! # async fn run() -> Result<(), KetoError> {
//! let client = AuthClient::builder()
//!     .config(ClientConfig::from_env())
//!     .connect()?;
//!
//! client.login(Provider::Kakao, "kakao-access-token").await?;
//! let plans: serde_json::Value = client.interceptor().get_json("/meal-plans").await?;
//! client.logout().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod interceptor;

pub use client::{AuthClient, AuthClientBuilder, ClientGuard, ClientInterceptor, SharedRefresher};
pub use config::{ClientConfig, env};
pub use error::KetoError;
pub use interceptor::AuthInterceptor;

pub use ketohelper_guard as guard;
pub use ketohelper_protocol as protocol;
pub use ketohelper_refresh as refresh;
pub use ketohelper_session as session;
pub use ketohelper_transport as transport;

/// The types most applications need, in one import.
pub mod prelude {
    pub use crate::{AuthClient, AuthClientBuilder, AuthInterceptor, ClientConfig, KetoError};
    pub use ketohelper_guard::{
        GuardConfig, GuardOutcome, HeadlessPrompt, LogNotifier, LoginPrompt, Notifier,
        RoutePolicy, RouteTable, SkipReason,
    };
    pub use ketohelper_protocol::{Provider, TokenClaims, User, UserPatch, decode_claims};
    pub use ketohelper_refresh::{RefreshConfig, RefreshScheduler, Refresher, TokenRefresher};
    pub use ketohelper_session::{
        FileStorage, HeadlessNavigator, MemoryStorage, Navigator, Session, SessionStore,
        Storage, StoreConfig,
    };
    pub use ketohelper_transport::{
        ApiRequest, ApiResponse, HttpTransport, ReqwestTransport,
    };
}
