//! # REST Backend
//!
//! Hosted Redis reached over HTTPS, one command per request.
//!
//! ## Dialect
//! - `GET  {base}/get/{key}`
//! - `POST {base}/sadd/{key}/{member}`
//! - `POST {base}/incr/{key}`
//!
//! Every request carries `Authorization: Bearer {token}`. Replies are JSON,
//! `{"result": ...}` on success and `{"error": "..."}` otherwise. Members are
//! placed in the path, so they are percent-encoded into a single segment.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::Value;

use super::{Backend, parse_counter};
use crate::error::BackendError;

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

pub struct RestBackend {
    client: Client,
    base: Url,
    token: String,
}

impl RestBackend {
    pub fn new(base: &str, token: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base = Url::parse(base).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn command(&self, method: Method, segments: &[&str]) -> Result<Value, BackendError> {
        let url = self.endpoint(segments)?;

        let response = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        let reply: Reply = serde_json::from_slice(&body).map_err(|e| {
            BackendError::Malformed(format!("status {status}, undecodable body: {e}"))
        })?;

        if let Some(error) = reply.error {
            return Err(BackendError::Remote(error));
        }

        if !status.is_success() {
            return Err(BackendError::Remote(format!("status {status}")));
        }

        Ok(reply.result)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn get_integer(&self, key: &str) -> Result<Option<u64>, BackendError> {
        match self.command(Method::GET, &["get", key]).await? {
            Value::Null => Ok(None),
            value => parse_counter(&value).map(Some),
        }
    }

    async fn add_to_set_if_absent(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        // SADD replies with the number of members actually added
        match self.command(Method::POST, &["sadd", key, member]).await? {
            Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
            Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
            other => Err(BackendError::Malformed(format!(
                "unexpected SADD result: {other}"
            ))),
        }
    }

    async fn increment_integer(&self, key: &str) -> Result<u64, BackendError> {
        let value = self.command(Method::POST, &["incr", key]).await?;

        parse_counter(&value)
    }
}
