use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::models::membership::MembershipRecord;
use crate::models::row::{self, RemoteRow};
use crate::models::workshop::{self, WorkshopRecord};
use crate::services::auth::AuthClient;

/// Fixed path of the relational data proxy, relative to the platform base
/// URL. One GET, no request body, no pagination.
pub const DATA_PATH: &str = "functions/v1/mysql";

/// Fetches and normalizes the two dashboard data slices. Both fetchers share
/// one code path up to row classification and are independent of each other;
/// callers may run them concurrently in any order.
#[derive(Clone)]
pub struct DashboardClient {
    http: Client,
    auth: AuthClient,
    base_url: Option<String>,
}

impl DashboardClient {
    pub fn new(config: &Config, auth: AuthClient) -> Self {
        Self {
            http: Client::new(),
            auth,
            base_url: config.supabase_url.clone(),
        }
    }

    /// Membership rows, normalized. Resolves to an empty list when nobody is
    /// signed in.
    pub async fn fetch_memberships(&self) -> Result<Vec<MembershipRecord>> {
        match self.fetch_rows().await? {
            None => Ok(Vec::new()),
            Some(rows) => Ok(rows
                .iter()
                .filter(|candidate| row::is_membership_row(candidate))
                .map(MembershipRecord::from_row)
                .collect()),
        }
    }

    /// Workshop registrations, grouped by form id with ticket counts.
    /// Resolves to an empty list when nobody is signed in.
    pub async fn fetch_workshops(&self) -> Result<Vec<WorkshopRecord>> {
        match self.fetch_rows().await? {
            None => Ok(Vec::new()),
            Some(rows) => Ok(workshop::group_by_form(
                rows.iter()
                    .filter(|candidate| row::is_workshop_row(candidate))
                    .filter_map(WorkshopRecord::from_row),
            )),
        }
    }

    /// Session gate plus the shared HTTP/envelope pipeline. `None` means
    /// "not logged in"; no request is issued in that case.
    async fn fetch_rows(&self) -> Result<Option<Vec<RemoteRow>>> {
        // Session first: a retrieval failure is an error, an absent session
        // is an empty dashboard.
        let session = self
            .auth
            .current_session()
            .await
            .map_err(|e| FetchError::Session(e.to_string()))?;
        let Some(session) = session else {
            tracing::debug!("no session, resolving dashboard fetch to empty");
            return Ok(None);
        };

        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| FetchError::Config("SUPABASE_URL missing".to_string()))?;
        let endpoint = data_endpoint(base)?;

        tracing::debug!(endpoint = %endpoint, "fetching dashboard rows");
        let response = self
            .http
            .get(endpoint)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, body = %raw, "dashboard data request failed");
            return Err(FetchError::Http { status, body: raw });
        }

        let json: Value = serde_json::from_str(&raw).map_err(|_| FetchError::NotJson)?;
        if is_falsy(&json) {
            return Err(FetchError::NotJson);
        }

        Ok(Some(extract_rows(&json)?))
    }
}

pub fn data_endpoint(base: &str) -> Result<Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), DATA_PATH);
    Url::parse(&raw).map_err(|e| FetchError::Config(format!("invalid SUPABASE_URL: {e}")))
}

/// Accepts the two envelope shapes the endpoint emits, a bare array or
/// `{ "data": [...] }`; anything else is a shape error. A null entry is a
/// shape error too, while other non-object entries are dropped since the
/// field-presence discriminator cannot classify them.
pub fn extract_rows(json: &Value) -> Result<Vec<RemoteRow>> {
    let entries = match json {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(FetchError::UnexpectedShape),
        },
        _ => return Err(FetchError::UnexpectedShape),
    };

    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::Object(map) => rows.push(map.clone()),
            Value::Null => return Err(FetchError::UnexpectedShape),
            _ => {}
        }
    }
    Ok(rows)
}

/// Falsy parse results (`null`, `false`, `0`, `""`) count as not-JSON
/// rather than as shape errors.
fn is_falsy(json: &Value) -> bool {
    match json {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
