use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the hosted platform. Optional here on purpose: a missing
    /// URL surfaces as a configuration error on the fetch that needs it, not
    /// as a startup failure.
    pub supabase_url: Option<String>,

    /// Public (anon) API key sent with auth requests.
    pub supabase_anon_key: Option<Secret<String>>,

    pub cache: CacheDefaults,
}

/// Cache defaults the presentation layer builds its query cache from.
///
/// These used to live in an ad-hoc global query-client; they are now
/// constructed once at process start and passed along explicitly. The
/// fetchers themselves never retry or cache; `retry` is advisory for the
/// consumer's cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheDefaults {
    pub stale_time_secs: u64,
    pub gc_time_secs: u64,
    pub retry: u32,
    pub refetch_on_focus: bool,
}

impl Default for CacheDefaults {
    fn default() -> Self {
        Self {
            stale_time_secs: 5 * 60,
            gc_time_secs: 30 * 60,
            retry: 1,
            refetch_on_focus: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            supabase_url: config.get("supabase_url").ok(),
            supabase_anon_key: config
                .get::<String>("supabase_anon_key")
                .ok()
                .map(Secret::new),
            cache: CacheDefaults {
                stale_time_secs: config
                    .get("cache_stale_time_secs")
                    .unwrap_or_else(|_| CacheDefaults::default().stale_time_secs),
                gc_time_secs: config
                    .get("cache_gc_time_secs")
                    .unwrap_or_else(|_| CacheDefaults::default().gc_time_secs),
                retry: config
                    .get("cache_retry")
                    .unwrap_or_else(|_| CacheDefaults::default().retry),
                refetch_on_focus: config.get("cache_refetch_on_focus").unwrap_or(false),
            },
        })
    }

    /// Configuration built directly from values, bypassing the environment.
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: Some(supabase_url.into()),
            supabase_anon_key: Some(Secret::new(supabase_anon_key.into())),
            cache: CacheDefaults::default(),
        }
    }
}
