use std::time::Duration;

use crate::{Error, Result};

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Feed
    pub feed_url: String,
    pub reconnect_delay: Duration,

    // History window length per instrument
    pub history_capacity: usize,

    // Dashboard
    pub dashboard_port: u16,

    // Advisory model
    pub advisor_api_key: Option<String>,
    pub advisor_model: String,
    pub advisor_base_url: String,

    // Indicator config file path
    pub indicator_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "wss://stream.binance.com:9443/ws".to_string(),
            reconnect_delay: Duration::from_secs(5),
            history_capacity: 100,
            dashboard_port: 8080,
            advisor_api_key: None,
            advisor_model: "gemini-2.5-flash".to_string(),
            advisor_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            indicator_config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads `.env` if present. Every variable is optional; malformed
    /// numeric values are rejected.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let history_capacity = parse_or(&lookup, "HISTORY_CAPACITY", defaults.history_capacity)?;
        if history_capacity == 0 {
            return Err(Error::Config("HISTORY_CAPACITY must be at least 1".into()));
        }

        Ok(Config {
            feed_url: lookup("FEED_URL").unwrap_or(defaults.feed_url),
            reconnect_delay: Duration::from_secs(parse_or(
                &lookup,
                "RECONNECT_DELAY_SECS",
                defaults.reconnect_delay.as_secs(),
            )?),
            history_capacity,
            dashboard_port: parse_or(&lookup, "DASHBOARD_PORT", defaults.dashboard_port)?,
            advisor_api_key: lookup("ADVISOR_API_KEY").filter(|k| !k.trim().is_empty()),
            advisor_model: lookup("ADVISOR_MODEL").unwrap_or(defaults.advisor_model),
            advisor_base_url: lookup("ADVISOR_BASE_URL").unwrap_or(defaults.advisor_base_url),
            indicator_config_path: lookup("INDICATOR_CONFIG_PATH"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}
