//! Configuration loader for the `stationflow` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Upstream station feed base URL.
    pub feed_url: String,

    /// Maximum number of feed pages to fetch per ingest run (safety limit).
    pub feed_max_pages: u32,

    /// Minutes since the last reading within which a station counts as
    /// online. Every status call site uses this one value.
    pub online_threshold_minutes: u32,

    /// Maximum number of stored readings loaded per history/trend query.
    pub history_fetch_limit: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `STATION_FEED_URL` – upstream station feed base URL
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `FEED_MAX_PAGES` – max feed pages per ingest run (default: 100)
/// - `ONLINE_THRESHOLD_MINUTES` – online cutoff (default: 30)
/// - `HISTORY_FETCH_LIMIT` – max readings per history query (default: 10000)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let feed_url = require_env!("STATION_FEED_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let feed_max_pages = parse_env_u32!("FEED_MAX_PAGES", 100);
    let online_threshold_minutes = parse_env_u32!("ONLINE_THRESHOLD_MINUTES", 30);
    let history_fetch_limit = parse_env_u32!("HISTORY_FETCH_LIMIT", 10_000);

    Ok(Config {
        db_url,
        db_pool_max,
        feed_url,
        feed_max_pages,
        online_threshold_minutes,
        history_fetch_limit,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL             : {}", masked_db_url);
        tracing::info!("  STATION_FEED_URL         : {}", self.feed_url);
        tracing::info!("  DB_POOL_MAX              : {}", self.db_pool_max);
        tracing::info!("  FEED_MAX_PAGES           : {}", self.feed_max_pages);
        tracing::info!("  ONLINE_THRESHOLD_MINUTES : {}", self.online_threshold_minutes);
        tracing::info!("  HISTORY_FETCH_LIMIT      : {}", self.history_fetch_limit);
    }
}
