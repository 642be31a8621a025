use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ranchdash::config::Config;
use ranchdash::models::{MembershipRecord, WorkshopRecord};
use ranchdash::services::auth::AuthClient;
use ranchdash::services::dashboard::DashboardClient;
use ranchdash::services::dates;
use ranchdash::services::fetch_task::{FetchState, FetchTask};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ranchdash=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration is built once here and passed along explicitly,
    // cache defaults included.
    let config = Config::from_env()?;
    tracing::info!(
        stale_time_secs = config.cache.stale_time_secs,
        gc_time_secs = config.cache.gc_time_secs,
        retry = config.cache.retry,
        "Configuration loaded"
    );

    let auth = AuthClient::new(&config);

    // Resolve the initial session: a stored refresh token if one was kept,
    // otherwise signed out.
    let stored_refresh_token = std::env::var("SUPABASE_REFRESH_TOKEN").ok();
    if let Err(err) = auth.restore(stored_refresh_token).await {
        tracing::warn!(error = %err, "could not restore stored session");
    }

    if auth.session_state().session().is_none() {
        if let (Ok(email), Ok(password)) = (
            std::env::var("DASHBOARD_EMAIL"),
            std::env::var("DASHBOARD_PASSWORD"),
        ) {
            match auth.sign_in_with_password(&email, &password).await {
                Ok(_) => tracing::info!("Signed in"),
                Err(err) => tracing::warn!(error = %err, "Sign-in failed"),
            }
        }
    }

    if let Some(email) = auth
        .session_state()
        .session()
        .and_then(|session| session.user.as_ref())
        .and_then(|user| user.email.clone())
    {
        println!("Signed in as {email}\n");
    }

    let client = DashboardClient::new(&config, auth.clone());

    // Both fetches run concurrently; neither waits for the other.
    let mut workshops = FetchTask::spawn({
        let client = client.clone();
        async move { client.fetch_workshops().await }
    });
    let mut memberships = FetchTask::spawn({
        let client = client.clone();
        async move { client.fetch_memberships().await }
    });

    render_workshops(&workshops.finished().await);
    render_membership(&memberships.finished().await);

    Ok(())
}

fn render_workshops(state: &FetchState<Vec<WorkshopRecord>>) {
    println!("MY WORKSHOPS");
    println!("Current registrations for your account.");
    match state {
        FetchState::Loading => println!("  Loading your workshops…"),
        FetchState::Failed(message) => println!("  Failed to load workshops: {message}"),
        FetchState::Ready(records) if records.is_empty() => println!("  No workshops yet."),
        FetchState::Ready(records) => {
            for record in records {
                let name = record.workshop_name.as_deref().unwrap_or("(unnamed)");
                println!("  {name}");
                if let Some(label) = record.status_label() {
                    println!("    {label} | {} Ticket(s)", record.tickets);
                }
                if let Some(url) = &record.resolved_url {
                    println!("    Details: {url}");
                }
            }
        }
    }
    println!("  More workshops: https://schoolofranch.org/calendar\n");
}

fn render_membership(state: &FetchState<Vec<MembershipRecord>>) {
    println!("MY MEMBERSHIP");
    println!("Memberships earn discounts and benefits.");
    match state {
        FetchState::Loading => println!("  Loading your membership data…"),
        FetchState::Failed(message) => println!("  Failed to load membership: {message}"),
        FetchState::Ready(records) => match records.first() {
            None => {
                println!("  Join and earn up to 20% off all workshops for a year!");
                println!("  Join: https://schoolofranch.org/join");
            }
            Some(membership) => {
                let expires = membership
                    .expirationdate
                    .as_deref()
                    .map(dates::format_event_date)
                    .unwrap_or_default();
                println!("  ID         {}", membership.memberid.as_deref().unwrap_or(""));
                println!(
                    "  Status     {}",
                    membership.memberstatus.as_deref().unwrap_or("")
                );
                println!("  Expires    {expires}");
                println!(
                    "  Auto Renew {}",
                    match membership.autorenew {
                        Some(true) => "Yes",
                        _ => "No",
                    }
                );
                println!(
                    "  Level      {}",
                    membership.levelname.as_deref().unwrap_or("")
                );
            }
        },
    }
}
