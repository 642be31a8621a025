use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use url::Url;

use crate::config::Config;
use crate::models::session::{AuthEvent, Session, SessionState, User};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth API error: HTTP {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("session expired and no refresh token is available")]
    SessionExpired,
}

/// Which verification flow an OTP code belongs to: a login code, or the
/// confirmation code sent after sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpType {
    Email,
    Signup,
}

impl OtpType {
    fn as_str(self) -> &'static str {
        match self {
            OtpType::Email => "email",
            OtpType::Signup => "signup",
        }
    }
}

/// Sign-up either issues a session immediately or parks the account until
/// the emailed confirmation code is verified.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    Session(Session),
    ConfirmationRequired,
}

/// Client for the hosted auth provider's REST surface (`{base}/auth/v1`).
///
/// Holds the current [`SessionState`] and publishes every change on a watch
/// channel, plus coarse [`AuthEvent`]s on a broadcast feed. Cheap to clone;
/// clones share the same session.
#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    base_url: Option<String>,
    anon_key: Option<Secret<String>>,
    state_tx: Arc<watch::Sender<SessionState>>,
    events_tx: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    pub fn new(config: &Config) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Loading);
        let (events_tx, _) = broadcast::channel(16);
        Self {
            http: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            state_tx: Arc::new(state_tx),
            events_tx,
        }
    }

    /// Snapshot of the tri-state session.
    pub fn session_state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Push feed of session changes, the equivalent of the provider's
    /// auth-state-change subscription.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events_tx.subscribe()
    }

    /// The session gate: waits for the tri-state to resolve, then produces
    /// the current session, refreshing an expired token first. `Ok(None)`
    /// means resolved-absent and is not an error; only a failed retrieval
    /// (here, a failed refresh) errors.
    pub async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let state = self.resolved_state().await;
        let Some(session) = state.session().cloned() else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        let refresh_token = session.refresh_token.ok_or(AuthError::SessionExpired)?;
        let refreshed = self.refresh(&refresh_token).await?;
        self.publish(refreshed.clone(), AuthEvent::TokenRefreshed);
        Ok(Some(refreshed))
    }

    /// Waits until the state has left `Loading`. An unresolved session must
    /// never read as signed out.
    async fn resolved_state(&self) -> SessionState {
        let mut rx = self.state_tx.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            if state.is_resolved() {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.state_tx.borrow().clone();
            }
        }
    }

    /// Resolves the initial `Loading` state from a stored refresh token, or
    /// to `Unauthenticated` when there is none. A failed restore also lands
    /// on `Unauthenticated` before the error is returned.
    pub async fn restore(&self, refresh_token: Option<String>) -> Result<Option<Session>, AuthError> {
        let Some(refresh_token) = refresh_token else {
            self.state_tx.send_replace(SessionState::Unauthenticated);
            return Ok(None);
        };
        match self.refresh(&refresh_token).await {
            Ok(session) => {
                self.publish(session.clone(), AuthEvent::SignedIn);
                Ok(Some(session))
            }
            Err(err) => {
                self.state_tx.send_replace(SessionState::Unauthenticated);
                Err(err)
            }
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        if !validate_email(email) {
            return Err(AuthError::Validation(
                "Please enter a valid email address.".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AuthError::Validation(
                "Please enter your password.".to_string(),
            ));
        }

        let payload: SessionPayload = self
            .post_json(
                "token",
                &[("grant_type", "password")],
                json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        let session = payload.into_session();
        self.publish(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        if !validate_email(email) {
            return Err(AuthError::Validation(
                "Please enter a valid email address.".to_string(),
            ));
        }
        if password.len() < 6 {
            return Err(AuthError::Validation(
                "Password must be at least 6 characters long.".to_string(),
            ));
        }
        if password != confirm_password {
            return Err(AuthError::Validation("Passwords do not match.".to_string()));
        }

        let body: Value = self
            .post_json(
                "signup",
                &[],
                json!({ "email": email, "password": password }),
                None,
            )
            .await?;

        // With email confirmation enabled the provider returns a bare user;
        // only an immediate session signs the account in.
        if body.get("access_token").is_some() {
            let payload: SessionPayload =
                serde_json::from_value(body).map_err(|e| AuthError::Api {
                    status: StatusCode::OK,
                    message: format!("unexpected signup response: {e}"),
                })?;
            let session = payload.into_session();
            self.publish(session.clone(), AuthEvent::SignedIn);
            Ok(SignUpOutcome::Session(session))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    /// Sends a one-time login code. Login codes never create accounts.
    pub async fn send_otp(&self, email: &str, create_user: bool) -> Result<(), AuthError> {
        if !validate_email(email) {
            return Err(AuthError::Validation(
                "Please enter a valid email address.".to_string(),
            ));
        }
        let _: Value = self
            .post_json(
                "otp",
                &[],
                json!({ "email": email, "create_user": create_user }),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn verify_otp(
        &self,
        email: &str,
        code: &str,
        otp_type: OtpType,
    ) -> Result<Session, AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::Validation(
                "Enter the 6-digit code from your email.".to_string(),
            ));
        }

        let payload: SessionPayload = self
            .post_json(
                "verify",
                &[],
                json!({ "type": otp_type.as_str(), "email": email, "token": code.trim() }),
                None,
            )
            .await?;
        let session = payload.into_session();
        self.publish(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    pub async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        if !validate_email(email) {
            return Err(AuthError::Validation(
                "Enter your email first to reset your password.".to_string(),
            ));
        }
        let mut body = json!({ "email": email });
        if let Some(redirect_to) = redirect_to {
            body["redirect_to"] = json!(redirect_to);
        }
        let _: Value = self.post_json("recover", &[], body, None).await?;
        Ok(())
    }

    /// Signs out. The local session is cleared first so the app lands in
    /// `Unauthenticated` even when the revocation call fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self
            .session_state()
            .session()
            .map(|session| session.access_token.clone());
        self.state_tx.send_replace(SessionState::Unauthenticated);
        let _ = self.events_tx.send(AuthEvent::SignedOut);

        if let Some(token) = token {
            let endpoint = self.endpoint("logout")?;
            let response = self
                .request(endpoint, &[], json!({}), Some(&token))
                .await?;
            let status = response.status();
            if !status.is_success() && status != StatusCode::UNAUTHORIZED {
                let body = response.text().await.unwrap_or_default();
                return Err(AuthError::Api {
                    status,
                    message: api_error_message(&body),
                });
            }
        }
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let payload: SessionPayload = self
            .post_json(
                "token",
                &[("grant_type", "refresh_token")],
                json!({ "refresh_token": refresh_token }),
                None,
            )
            .await?;
        Ok(payload.into_session())
    }

    fn publish(&self, session: Session, event: AuthEvent) {
        tracing::debug!(?event, "session state changed");
        self.state_tx.send_replace(SessionState::Authenticated(session));
        let _ = self.events_tx.send(event);
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| AuthError::Config("SUPABASE_URL missing".to_string()))?;
        let raw = format!("{}/auth/v1/{}", base.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| AuthError::Config(format!("invalid SUPABASE_URL: {e}")))
    }

    async fn request(
        &self,
        endpoint: Url,
        query: &[(&str, &str)],
        body: Value,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, AuthError> {
        let mut request = self.http.post(endpoint).query(query).json(&body);
        if let Some(anon_key) = &self.anon_key {
            request = request.header("apikey", anon_key.expose_secret());
        }
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        Ok(request.send().await?)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Value,
        bearer: Option<&str>,
    ) -> Result<T, AuthError> {
        let endpoint = self.endpoint(path)?;
        tracing::debug!(path = %path, "auth request");

        let response = self.request(endpoint, query, body, bearer).await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            tracing::debug!(status = %status, body = %raw, "auth request failed");
            return Err(AuthError::Api {
                status,
                message: api_error_message(&raw),
            });
        }

        serde_json::from_str(&raw).map_err(|e| AuthError::Api {
            status,
            message: format!("unexpected auth response: {e}"),
        })
    }
}

/// Pulls the human-readable message out of the provider's error body; the
/// body itself is the fallback.
fn api_error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|key| value.get(key)?.as_str().map(str::to_string))
    });
    message.unwrap_or_else(|| body.to_string())
}

/// Same shape the auth screen enforced: something@something.something, no
/// whitespace anywhere.
pub fn validate_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
        }
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<UserPayload>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    email: Option<String>,
}

impl SessionPayload {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            user: self.user.map(|user| User {
                id: user.id,
                email: user.email,
            }),
        }
    }
}
