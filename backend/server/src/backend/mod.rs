//! # Key-Value Backend
//!
//! Remote store holding the two counting entities.
//!
//! ## Keys
//!
//! - `entered_sessions`: **set** of session ids that have been counted
//! - `entered_count`: **int**, number of members ever added to the set
//!
//! Both are created on first write. An absent count reads as 0.
//!
//! ## Primitives
//!
//! Every method maps to exactly one atomic remote command, there is no
//! multi-command transaction available on the hosted store.
//! - `get_integer` -> `GET`
//! - `add_to_set_if_absent` -> `SADD`, true when the member was new
//! - `increment_integer` -> `INCR`, returns the value after incrementing
//!
//! ## Implementations
//!
//! - REST: hosted store over HTTP with a bearer token
//! - Redis: direct connection for self-hosting
//! - Unconfigured: no credentials, reads are empty and writes refuse
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    config::{BackendConfig, Config},
    error::BackendError,
};

#[cfg(test)]
pub mod memory;
pub mod native;
pub mod rest;

pub const SESSIONS_KEY: &str = "entered_sessions";
pub const COUNT_KEY: &str = "entered_count";

#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_integer(&self, key: &str) -> Result<Option<u64>, BackendError>;

    async fn add_to_set_if_absent(&self, key: &str, member: &str) -> Result<bool, BackendError>;

    async fn increment_integer(&self, key: &str) -> Result<u64, BackendError>;
}

pub struct Unconfigured;

#[async_trait]
impl Backend for Unconfigured {
    async fn get_integer(&self, _key: &str) -> Result<Option<u64>, BackendError> {
        Ok(None)
    }

    async fn add_to_set_if_absent(&self, _key: &str, _member: &str) -> Result<bool, BackendError> {
        Err(BackendError::Unconfigured)
    }

    async fn increment_integer(&self, _key: &str) -> Result<u64, BackendError> {
        Err(BackendError::Unconfigured)
    }
}

/// Builds the configured backend. Only a malformed URL fails here, an
/// unreachable store is reported per request so later requests can still
/// count.
pub fn init_backend(config: &Config) -> Result<Arc<dyn Backend>, BackendError> {
    let backend: Arc<dyn Backend> = match &config.backend {
        BackendConfig::Redis { url } => {
            info!("Using Redis backend");
            Arc::new(native::RedisBackend::new(url, config.backend_timeout)?)
        }
        BackendConfig::Rest { url, token } => {
            info!("Using REST backend at {url}");
            Arc::new(rest::RestBackend::new(url, token, config.backend_timeout)?)
        }
        BackendConfig::Unconfigured => Arc::new(Unconfigured),
    };

    Ok(backend)
}

/// Parses a counter value as stored by the backend, either a JSON number or
/// the decimal string `GET` hands back.
pub(crate) fn parse_counter(value: &serde_json::Value) -> Result<u64, BackendError> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| BackendError::Malformed(format!("counter out of range: {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| BackendError::Malformed(format!("counter is not an integer: {s:?}"))),
        other => Err(BackendError::Malformed(format!(
            "unexpected counter value: {other}"
        ))),
    }
}
