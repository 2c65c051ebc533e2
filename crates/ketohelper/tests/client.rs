//! Integration tests for login, logout, navigation, and rehydration.

mod common;

use ketohelper::guard::{GuardOutcome, LoginPrompt};
use ketohelper::protocol::{Provider, endpoints};
use ketohelper::session::Navigator;
use ketohelper::{AuthClient, ClientConfig, KetoError};

use common::{Harness, MockBackend, PROVIDER_TOKEN, token};

// =========================================================================
// Login
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_login_kakao_installs_session_and_arms_timer() {
    let h = Harness::at("/subscribe", MockBackend::refusing());
    h.prompt.open();

    let user = h.client.login(Provider::Kakao, PROVIDER_TOKEN).await.unwrap();

    assert_eq!(user.id, "1");
    assert_eq!(user.name, "Keto");
    let store = h.client.store();
    assert!(store.is_authenticated());
    assert_eq!(store.user(), Some(user));
    assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    assert!(!store.snapshot().is_guest);
    assert!(h.client.scheduler().is_scheduled());
    assert!(!h.prompt.is_open(), "login closes the prompt");

    let sent = h.backend().requests_to(endpoints::KAKAO_LOGIN);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].bearer.is_none());
    assert_eq!(
        sent[0].body.as_ref().unwrap()["access_token"],
        PROVIDER_TOKEN
    );
}

#[tokio::test(start_paused = true)]
async fn test_login_rejected_token_leaves_guest_session() {
    let h = Harness::at("/", MockBackend::refusing());

    let result = h.client.login(Provider::Google, "forged").await;

    assert!(matches!(result, Err(KetoError::Status(401))));
    assert!(h.client.store().user().is_none());
    assert!(h.client.store().snapshot().is_guest);
    assert!(!h.client.scheduler().is_scheduled());
}

#[tokio::test(start_paused = true)]
async fn test_login_naver_provider_is_rejected_locally() {
    let h = Harness::at("/", MockBackend::refusing());

    let result = h.client.login(Provider::Naver, PROVIDER_TOKEN).await;

    assert!(matches!(result, Err(KetoError::Protocol(_))));
    assert!(h.backend().requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_login_naver_without_redirect_uri_is_config_error() {
    let h = Harness::at("/", MockBackend::refusing());

    let result = h.client.login_naver(PROVIDER_TOKEN, "state").await;

    assert!(matches!(result, Err(KetoError::Config(_))));
    assert!(h.backend().requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_login_naver_sends_code_state_and_redirect() {
    let config = ClientConfig {
        naver_redirect_uri: Some("https://app.example.com/auth/naver".into()),
        ..ClientConfig::default()
    };
    let h = Harness::with_config("/", MockBackend::refusing(), config);
    let state = AuthClient::<MockBackend>::new_oauth_state();

    h.client.login_naver(PROVIDER_TOKEN, &state).await.unwrap();

    let sent = h.backend().requests_to(endpoints::NAVER_LOGIN);
    let body = sent[0].body.as_ref().unwrap();
    assert_eq!(body["code"], PROVIDER_TOKEN);
    assert_eq!(body["state"], state.as_str());
    assert_eq!(body["redirect_uri"], "https://app.example.com/auth/naver");
    assert!(h.client.store().is_authenticated());
}

#[test]
fn test_new_oauth_state_is_fresh_hex() {
    let a = AuthClient::<MockBackend>::new_oauth_state();
    let b = AuthClient::<MockBackend>::new_oauth_state();

    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_ne!(a, b);
}

// =========================================================================
// Logout
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_logout_on_protected_page_goes_home_and_mutes_next_notice() {
    let h = Harness::at("/", MockBackend::refusing());
    h.client.login(Provider::Kakao, PROVIDER_TOKEN).await.unwrap();
    let login_token = h.client.store().access_token();
    h.nav.visit("/calendar");

    h.client.logout().await;

    assert_eq!(h.nav.history(), vec!["/".to_string()]);
    assert!(h.client.store().user().is_none());
    assert!(h.client.store().access_token().is_none());
    assert!(!h.client.store().is_logging_out());
    assert!(!h.client.scheduler().is_scheduled());
    let sent = h.backend().requests_to(endpoints::LOGOUT);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].bearer, login_token);

    h.nav.visit("/subscribe");
    let outcome = h.client.on_navigate("/subscribe").await;
    assert_eq!(outcome, GuardOutcome::LoginPrompted { notified: false });
}

#[tokio::test(start_paused = true)]
async fn test_logout_on_public_page_stays_put() {
    let h = Harness::at("/recipes", MockBackend::refusing());
    h.client.login(Provider::Kakao, PROVIDER_TOKEN).await.unwrap();

    h.client.logout().await;

    assert!(h.nav.history().is_empty());
    assert_eq!(h.nav.current_path(), "/recipes");
    assert!(h.client.store().user().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_logout_backend_failure_still_clears() {
    let mut backend = MockBackend::refusing();
    backend.logout_status = 500;
    let h = Harness::at("/", backend);
    h.client.login(Provider::Kakao, PROVIDER_TOKEN).await.unwrap();
    let guest_id = h.client.store().snapshot().guest_id;

    h.client.logout().await;

    let session = h.client.store().snapshot();
    assert!(session.user.is_none());
    assert!(session.is_guest);
    assert_eq!(session.guest_id, guest_id, "guest id survives logout");
}

// =========================================================================
// Navigation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_on_navigate_refreshed_session_rearms_timer() {
    let h = Harness::at("/", MockBackend::issuing(&token("fresh", 3_600)));
    h.sign_in(&token("expired", -10));
    assert!(!h.client.scheduler().is_scheduled());

    h.nav.visit("/calendar");
    let outcome = h.client.on_navigate("/calendar").await;

    assert_eq!(outcome, GuardOutcome::Refreshed);
    assert!(h.client.store().is_authenticated());
    assert!(h.client.scheduler().is_scheduled());
}

#[tokio::test(start_paused = true)]
async fn test_on_login_prompt_dismissed_without_session_goes_home() {
    let h = Harness::at("/", MockBackend::refusing());
    h.nav.visit("/subscribe");
    h.client.on_navigate("/subscribe").await;
    assert!(h.prompt.is_open());

    assert!(h.client.on_login_prompt_dismissed());
    assert_eq!(h.nav.current_path(), "/");
}

// =========================================================================
// Persistence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_build_with_state_dir_rehydrates_and_schedules() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..ClientConfig::default()
    };

    let first = Harness::with_config("/", MockBackend::refusing(), config.clone());
    first.client.login(Provider::Kakao, PROVIDER_TOKEN).await.unwrap();
    let before = first.client.store().snapshot();
    drop(first);

    let second = Harness::with_config("/", MockBackend::refusing(), config);
    let after = second.client.store().snapshot();

    assert_eq!(after.user, before.user);
    assert_eq!(after.access_token, before.access_token);
    assert_eq!(after.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(after.guest_id, before.guest_id);
    assert!(second.client.scheduler().is_scheduled());
}

#[tokio::test(start_paused = true)]
async fn test_build_generates_guest_id() {
    let h = Harness::at("/", MockBackend::refusing());

    let session = h.client.store().snapshot();

    assert!(session.guest_id.is_some());
    assert!(session.is_guest);
}
