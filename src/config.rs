use std::time::Duration;

use anyhow::{Context, Result};

use crate::fetch::DEFAULT_LISTING_URL;

const ENV_HOST: &str = "ADWATCH_HOST";
const ENV_PORT: &str = "ADWATCH_PORT";
const ENV_LISTING_URL: &str = "ADWATCH_LISTING_URL";
const ENV_FETCH_TIMEOUT_SECS: &str = "ADWATCH_FETCH_TIMEOUT_SECS";
const ENV_REGISTRY_URL: &str = "ADWATCH_REGISTRY_URL";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Listing URL template, `{region}` is substituted per request.
    pub listing_url: String,
    pub fetch_timeout: Duration,
    /// `sqlite:` URL; `None` keeps the registry in memory.
    pub registry_url: Option<String>,
}

impl Settings {
    /// Reads settings from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get(ENV_PORT) {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("{ENV_PORT} must be a port number, got `{v}`"))?,
            None => 8080,
        };
        let timeout_secs = match get(ENV_FETCH_TIMEOUT_SECS) {
            Some(v) => v.trim().parse::<u64>().with_context(|| {
                format!("{ENV_FETCH_TIMEOUT_SECS} must be whole seconds, got `{v}`")
            })?,
            None => DEFAULT_FETCH_TIMEOUT_SECS,
        };

        Ok(Self {
            host: get(ENV_HOST).unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            listing_url: get(ENV_LISTING_URL).unwrap_or_else(|| DEFAULT_LISTING_URL.to_string()),
            fetch_timeout: Duration::from_secs(timeout_secs),
            registry_url: get(ENV_REGISTRY_URL),
        })
    }
}
