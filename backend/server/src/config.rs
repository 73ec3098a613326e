use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Which key-value store the counter lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Redis { url: String },
    Rest { url: String, token: String },
    Unconfigured,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: BackendConfig,
    pub backend_timeout: Duration,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| var(key).or_else(|| read_secret(key)))
    }

    /// Builds the config from any key lookup, `load` uses the environment
    /// followed by `/run/secrets`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match (
            lookup("REDIS_URL"),
            lookup("UPSTASH_REDIS_REST_URL"),
            lookup("UPSTASH_REDIS_REST_TOKEN"),
        ) {
            (Some(url), _, _) => BackendConfig::Redis { url },
            (None, Some(url), Some(token)) => BackendConfig::Rest { url, token },
            _ => {
                warn!("No backend credentials found, entries will not be counted");
                BackendConfig::Unconfigured
            }
        };

        let timeout_ms: u64 = try_load(&lookup, "BACKEND_TIMEOUT_MS", "5000")?;

        Ok(Self {
            port: try_load(&lookup, "RUST_PORT", "3000")?,
            backend,
            backend_timeout: Duration::from_millis(timeout_ms),
            stripe_secret_key: lookup("STRIPE_SECRET_KEY"),
            stripe_api_base: lookup("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse::<T>().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: e.to_string(),
        }
    })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
}
