// Integration tests for the auth provider client against a mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ranchdash::config::Config;
use ranchdash::models::{AuthEvent, SessionState};
use ranchdash::services::auth::{AuthClient, AuthError, OtpType, SignUpOutcome};

fn session_body(access_token: &str, expires_in: i64) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh-token",
        "expires_in": expires_in,
        "user": { "id": "user-1", "email": "you@example.com" }
    })
}

#[tokio::test]
async fn sign_in_publishes_authenticated_on_the_feed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({
            "email": "you@example.com",
            "password": "password123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt", 3600)))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    let mut states = auth.subscribe();
    let mut events = auth.subscribe_events();

    assert_eq!(auth.session_state(), SessionState::Loading);

    let session = auth
        .sign_in_with_password("you@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(session.access_token, "jwt");
    assert_eq!(
        session.user.as_ref().and_then(|u| u.email.as_deref()),
        Some("you@example.com")
    );

    states.changed().await.unwrap();
    assert!(matches!(*states.borrow(), SessionState::Authenticated(_)));
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);
}

#[tokio::test]
async fn sign_in_surfaces_the_provider_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    let err = auth
        .sign_in_with_password("you@example.com", "wrong")
        .await
        .unwrap_err();
    match err {
        AuthError::Api { status, message } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn validation_failures_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));

    assert!(matches!(
        auth.sign_in_with_password("not an email", "pw").await,
        Err(AuthError::Validation(_))
    ));
    assert!(matches!(
        auth.sign_in_with_password("you@example.com", "").await,
        Err(AuthError::Validation(_))
    ));
    assert!(matches!(
        auth.sign_up("you@example.com", "short", "short").await,
        Err(AuthError::Validation(_))
    ));
    assert!(matches!(
        auth.sign_up("you@example.com", "password123", "different")
            .await,
        Err(AuthError::Validation(_))
    ));
    assert!(matches!(
        auth.verify_otp("you@example.com", "   ", OtpType::Email).await,
        Err(AuthError::Validation(_))
    ));
}

#[tokio::test]
async fn sign_up_without_session_requires_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "email": "you@example.com"
        })))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    let outcome = auth
        .sign_up("you@example.com", "password123", "password123")
        .await
        .unwrap();
    assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired));
    // No session was issued, so the feed was not updated.
    assert_eq!(auth.session_state(), SessionState::Loading);
}

#[tokio::test]
async fn login_codes_do_not_create_accounts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/otp"))
        .and(body_json(json!({
            "email": "you@example.com",
            "create_user": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    auth.send_otp("you@example.com", false).await.unwrap();
}

#[tokio::test]
async fn verifying_a_code_signs_the_user_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .and(body_json(json!({
            "type": "email",
            "email": "you@example.com",
            "token": "123456"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-otp", 3600)))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    let session = auth
        .verify_otp("you@example.com", " 123456 ", OtpType::Email)
        .await
        .unwrap();
    assert_eq!(session.access_token, "jwt-otp");
    assert!(matches!(
        auth.session_state(),
        SessionState::Authenticated(_)
    ));
}

#[tokio::test]
async fn reset_password_posts_the_recover_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .and(body_json(json!({
            "email": "you@example.com",
            "redirect_to": "https://app.example.org/auth/reset"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    auth.reset_password_for_email("you@example.com", Some("https://app.example.org/auth/reset"))
        .await
        .unwrap();
}

#[tokio::test]
async fn an_expired_session_is_refreshed_by_the_gate() {
    let server = MockServer::start().await;
    // expires_in inside the refresh margin, so the gate must refresh.
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-old", 10)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-new", 3600)))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    let mut events = auth.subscribe_events();
    auth.sign_in_with_password("you@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);

    let session = auth.current_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "jwt-new");
    assert_eq!(events.recv().await.unwrap(), AuthEvent::TokenRefreshed);
}

#[tokio::test]
async fn a_failed_refresh_is_a_session_error_not_a_signout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-old", 10)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "msg": "Refresh token has been revoked"
        })))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    auth.sign_in_with_password("you@example.com", "password123")
        .await
        .unwrap();

    let err = auth.current_session().await.unwrap_err();
    assert!(err.to_string().contains("Refresh token has been revoked"));
}

#[tokio::test]
async fn restore_resolves_the_tri_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt", 3600)))
        .mount(&server)
        .await;

    // Without a stored token the state resolves to Unauthenticated.
    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    assert_eq!(auth.session_state(), SessionState::Loading);
    assert!(auth.restore(None).await.unwrap().is_none());
    assert_eq!(auth.session_state(), SessionState::Unauthenticated);

    // With one, it resolves to Authenticated.
    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    let session = auth
        .restore(Some("stored-refresh".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.access_token, "jwt");
    assert!(matches!(
        auth.session_state(),
        SessionState::Authenticated(_)
    ));
}

#[tokio::test]
async fn the_gate_waits_for_resolution_instead_of_answering_signed_out() {
    let auth = AuthClient::new(&Config::new("http://127.0.0.1:1", "anon-key"));
    assert_eq!(auth.session_state(), SessionState::Loading);

    let gate = {
        let auth = auth.clone();
        tokio::spawn(async move { auth.current_session().await })
    };

    // An unresolved session must hold the gate open, not read as absent.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!gate.is_finished());

    auth.restore(None).await.unwrap();
    assert!(gate.await.unwrap().unwrap().is_none());
}

#[tokio::test]
async fn sign_out_clears_the_session_even_if_revocation_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt", 3600)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("revocation down"))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&Config::new(server.uri(), "anon-key"));
    let mut events = auth.subscribe_events();
    auth.sign_in_with_password("you@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);

    let result = auth.sign_out().await;
    assert!(result.is_err());
    assert_eq!(auth.session_state(), SessionState::Unauthenticated);
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
}

#[tokio::test]
async fn missing_base_url_fails_auth_calls_with_a_config_error() {
    let config = Config {
        supabase_url: None,
        supabase_anon_key: None,
        cache: Default::default(),
    };
    let auth = AuthClient::new(&config);
    assert!(matches!(
        auth.sign_in_with_password("you@example.com", "password123")
            .await,
        Err(AuthError::Config(_))
    ));
}
