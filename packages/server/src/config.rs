use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on per-request fan-out regardless of configuration.
pub const MAX_MATCH_CONCURRENCY: usize = 16;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub strain_cache_ttl: Duration,
    pub matching: MatchingConfig,
}

/// Tunables consumed by the orchestrators and the workflow service.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Bounded parallelism for per-candidate pricing/family/record work.
    pub concurrency: usize,
    /// Default per-line quantity cap when drafting a quote from matches.
    pub quote_line_cap: f64,
    /// Days since last purchase after which a historical buyer counts as lapsed.
    pub lapsed_buyer_days: i64,
    /// Minimum repeat purchases before a signature becomes a pattern.
    pub historical_min_purchases: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            quote_line_cap: 10.0,
            lapsed_buyer_days: 90,
            historical_min_purchases: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = MatchingConfig::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_var("PORT", 8080).context("PORT must be a valid number")?,
            request_timeout: Duration::from_secs(
                parse_var("REQUEST_TIMEOUT_SECS", 30)
                    .context("REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            ),
            strain_cache_ttl: Duration::from_secs(
                parse_var("STRAIN_CACHE_TTL_SECS", 300)
                    .context("STRAIN_CACHE_TTL_SECS must be a number of seconds")?,
            ),
            matching: MatchingConfig {
                concurrency: parse_var("MATCH_CONCURRENCY", defaults.concurrency)
                    .context("MATCH_CONCURRENCY must be a positive number")?
                    .clamp(1, MAX_MATCH_CONCURRENCY),
                quote_line_cap: parse_var("QUOTE_LINE_CAP", defaults.quote_line_cap)
                    .context("QUOTE_LINE_CAP must be a number")?,
                lapsed_buyer_days: parse_var("LAPSED_BUYER_DAYS", defaults.lapsed_buyer_days)
                    .context("LAPSED_BUYER_DAYS must be a number of days")?,
                historical_min_purchases: parse_var(
                    "HISTORICAL_MIN_PURCHASES",
                    defaults.historical_min_purchases,
                )
                .context("HISTORICAL_MIN_PURCHASES must be a number")?,
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => Ok(raw.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
