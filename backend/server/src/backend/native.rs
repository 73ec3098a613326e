//! # Redis
//!
//! Direct connection for self-hosted deployments.
//!
//! `SADD`, `INCR` and `GET` are each atomic on the server, Redis queues them,
//! so the counting protocol holds without `MULTI`.
//!
//! The connection is opened on first use. A failed connect leaves the cell
//! empty, so the next request tries again instead of the process giving up on
//! Redis for good. Every command is bounded by the backend timeout.
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::OnceCell;
use tracing::info;

use super::Backend;
use crate::error::BackendError;

pub struct RedisBackend {
    client: Client,
    timeout: Duration,
    connection_manager: OnceCell<ConnectionManager>,
}

impl RedisBackend {
    pub fn new(redis_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::open(redis_url)?;

        Ok(Self {
            client,
            timeout,
            connection_manager: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, BackendError> {
        let connection_manager = self
            .connection_manager
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(1)
                    .set_connection_timeout(self.timeout)
                    .set_response_timeout(self.timeout);

                let connection_manager = self
                    .client
                    .get_connection_manager_with_config(config)
                    .await?;
                info!("Connected to Redis");

                Ok::<_, BackendError>(connection_manager)
            })
            .await?;

        Ok(connection_manager.clone())
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get_integer(&self, key: &str) -> Result<Option<u64>, BackendError> {
        let mut connection = self.connection().await?;
        let value: Option<String> = connection.get(key).await?;

        value
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    BackendError::Malformed(format!("counter is not an integer: {raw:?}"))
                })
            })
            .transpose()
    }

    async fn add_to_set_if_absent(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        let mut connection = self.connection().await?;
        let added: u32 = connection.sadd(key, member).await?;

        Ok(added == 1)
    }

    async fn increment_integer(&self, key: &str) -> Result<u64, BackendError> {
        let mut connection = self.connection().await?;
        let value: i64 = connection.incr(key, 1).await?;

        u64::try_from(value)
            .map_err(|_| BackendError::Malformed(format!("counter went negative: {value}")))
    }
}
