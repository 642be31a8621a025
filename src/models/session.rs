use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Credential proving an authenticated user, as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

impl Session {
    /// Whether the access token should be refreshed before use. A small
    /// margin keeps a token from expiring mid-request.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= Utc::now() + Duration::seconds(30),
            None => false,
        }
    }
}

/// The session as the rest of the app sees it. `Loading` (not yet resolved)
/// is distinct from `Unauthenticated` (resolved, no session).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Loading)
    }
}

/// Session lifecycle notifications published on the auth change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}
