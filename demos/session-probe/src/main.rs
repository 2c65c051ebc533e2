//! Walks one session through its lifecycle against a live backend:
//! login, an authenticated call, a guarded navigation, and logout.
//!
//! ```text
//! KETO_API_BASE_URL=https://api.example.com \
//!     session-probe kakao <provider-access-token> [/api/path]
//!     session-probe naver <authorization-code> <oauth-state> [/api/path]
//! ```
//!
//! The provider token may also come from `KETO_PROVIDER_TOKEN`, and the
//! Naver state from `KETO_OAUTH_STATE`. The state must be the one sent
//! with the authorization request that produced the code. Set
//! `RUST_LOG=debug` to watch the refresh machinery.

use ketohelper::prelude::*;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const PROVIDER_TOKEN_VAR: &str = "KETO_PROVIDER_TOKEN";
const OAUTH_STATE_VAR: &str = "KETO_OAUTH_STATE";
const DEFAULT_API_PATH: &str = "/users/me";

#[derive(Debug, PartialEq)]
struct Args {
    provider: Provider,
    credential: String,
    /// Only set for Naver.
    oauth_state: Option<String>,
    api_path: String,
}

fn parse_provider(name: &str) -> Option<Provider> {
    match name.to_ascii_lowercase().as_str() {
        "google" => Some(Provider::Google),
        "kakao" => Some(Provider::Kakao),
        "naver" => Some(Provider::Naver),
        _ => None,
    }
}

/// Reads positional arguments, falling back to `env` for secrets.
fn parse_args<I, E>(args: I, env: E) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
    E: Fn(&str) -> Option<String>,
{
    let mut args = args.into_iter();
    let provider_name = args.next().unwrap_or_else(|| "kakao".to_string());
    let Some(provider) = parse_provider(&provider_name) else {
        return Err(format!("unknown provider `{provider_name}` (google, kakao, naver)"));
    };
    let Some(credential) = args.next().or_else(|| env(PROVIDER_TOKEN_VAR)) else {
        return Err(format!("pass a provider token or set {PROVIDER_TOKEN_VAR}"));
    };
    let oauth_state = match provider {
        Provider::Naver => match args.next().or_else(|| env(OAUTH_STATE_VAR)) {
            Some(state) => Some(state),
            None => {
                return Err(format!(
                    "naver needs the oauth state of the authorization request; pass it or set {OAUTH_STATE_VAR}"
                ));
            }
        },
        _ => None,
    };
    let api_path = args.next().unwrap_or_else(|| DEFAULT_API_PATH.to_string());
    Ok(Args {
        provider,
        credential,
        oauth_state,
        api_path,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Args {
        provider,
        credential,
        oauth_state,
        api_path,
    } = parse_args(std::env::args().skip(1), |name| std::env::var(name).ok())?;

    let client = AuthClient::builder()
        .config(ClientConfig::from_env())
        .connect()?;

    let user = match (provider, oauth_state) {
        (Provider::Naver, Some(state)) => client.login_naver(&credential, &state).await?,
        (other, _) => client.login(other, &credential).await?,
    };
    info!(user_id = %user.id, name = %user.name, "signed in");

    match client.interceptor().get_json::<Value>(&api_path).await {
        Ok(body) => info!(path = %api_path, %body, "api call succeeded"),
        Err(e) if e.requires_login() => error!(error = %e, "session lost during api call"),
        Err(e) => error!(path = %api_path, error = %e, "api call failed"),
    }

    let outcome = client.on_navigate("/calendar").await;
    info!(?outcome, "guard evaluated /calendar");

    client.logout().await;
    info!(
        guest_id = client.store().snapshot().guest_id.as_deref().unwrap_or("-"),
        "back to guest mode"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    // =====================================================================
    // parse_args
    // =====================================================================

    #[test]
    fn test_parse_args_naver_takes_state_from_argv() {
        let parsed = parse_args(args(&["naver", "code-1", "state-1", "/api/meals"]), no_env).unwrap();

        assert_eq!(parsed.provider, Provider::Naver);
        assert_eq!(parsed.credential, "code-1");
        assert_eq!(parsed.oauth_state.as_deref(), Some("state-1"));
        assert_eq!(parsed.api_path, "/api/meals");
    }

    #[test]
    fn test_parse_args_naver_takes_state_from_env() {
        let env = |name: &str| (name == OAUTH_STATE_VAR).then(|| "state-env".to_string());

        let parsed = parse_args(args(&["naver", "code-1"]), env).unwrap();

        assert_eq!(parsed.oauth_state.as_deref(), Some("state-env"));
        assert_eq!(parsed.api_path, DEFAULT_API_PATH);
    }

    #[test]
    fn test_parse_args_naver_without_state_is_error() {
        let err = parse_args(args(&["naver", "code-1"]), no_env).unwrap_err();

        assert!(err.contains(OAUTH_STATE_VAR), "{err}");
    }

    #[test]
    fn test_parse_args_kakao_needs_no_state() {
        let env = |name: &str| (name == PROVIDER_TOKEN_VAR).then(|| "from-env".to_string());

        let parsed = parse_args(args(&["KAKAO"]), env).unwrap();

        assert_eq!(parsed.provider, Provider::Kakao);
        assert_eq!(parsed.credential, "from-env");
        assert!(parsed.oauth_state.is_none());
    }

    #[test]
    fn test_parse_args_unknown_provider_is_error() {
        assert!(parse_args(args(&["github", "x"]), no_env).is_err());
    }
}
