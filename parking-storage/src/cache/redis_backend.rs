//! Redis cache backend.
//!
//! The connection manager is created lazily on first use and reused after
//! that, so the service can boot while Redis is down and pick it up once it
//! comes back. Every command failure is reported as a `CacheError`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use parking_core::CacheError;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, RedisError,
};
use tokio::sync::Mutex;

use super::traits::CacheClient;

/// Connection settings for [`RedisCache`].
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Reconnect attempts the manager makes before giving up on a command.
    pub number_of_retries: usize,
    /// Upper bound on establishing a connection.
    pub connection_timeout: Duration,
    /// Upper bound on waiting for the reply to a single command.
    pub response_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            number_of_retries: 1,
            connection_timeout: Duration::from_millis(250),
            response_timeout: Duration::from_millis(250),
        }
    }
}

impl RedisCacheConfig {
    /// Longest a cache call may take, connecting included.
    pub fn call_budget(&self) -> Duration {
        self.connection_timeout + self.response_timeout
    }
}

/// Cache client backed by a Redis server.
pub struct RedisCache {
    client: Client,
    config: RedisCacheConfig,
    manager: Mutex<Option<ConnectionManager>>,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Parse `url` without connecting.
    pub fn open(url: &str) -> Result<Self, CacheError> {
        Self::open_with_config(url, RedisCacheConfig::default())
    }

    pub fn open_with_config(url: &str, config: RedisCacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|e| CacheError::Unavailable {
            reason: format!("invalid Redis URL: {}", e),
        })?;

        Ok(Self {
            client,
            config,
            manager: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RedisCacheConfig {
        &self.config
    }

    /// The lock only guards the slot; connecting happens outside it so a
    /// slow server cannot queue every caller behind one attempt.
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        if let Some(manager) = self.manager.lock().await.as_ref() {
            return Ok(manager.clone());
        }

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(self.config.number_of_retries)
            .set_connection_timeout(self.config.connection_timeout)
            .set_response_timeout(self.config.response_timeout);

        let manager = self
            .client
            .get_connection_manager_with_config(manager_config)
            .await
            .map_err(|e| CacheError::Unavailable {
                reason: e.to_string(),
            })?;

        let mut slot = self.manager.lock().await;
        if slot.is_none() {
            tracing::info!("Connected to Redis");
        }
        Ok(slot.get_or_insert(manager).clone())
    }

    /// Run one cache call under the call budget. A server that accepts the
    /// connection but never answers surfaces as `Unavailable`.
    async fn bounded<T, F>(&self, key: &str, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let budget = self.config.call_budget();
        tokio::time::timeout(budget, call)
            .await
            .map_err(|_| CacheError::Unavailable {
                reason: format!("no reply for '{}' within {:?}", key, budget),
            })?
    }
}

fn command_error(key: &str, err: RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        CacheError::Unavailable {
            reason: err.to_string(),
        }
    } else {
        CacheError::Command {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(key, async {
            let mut conn = self.connection().await?;
            conn.get::<_, Option<String>>(key)
                .await
                .map_err(|e| command_error(key, e))
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.bounded(key, async {
            let mut conn = self.connection().await?;
            conn.set::<_, _, ()>(key, value)
                .await
                .map_err(|e| command_error(key, e))
        })
        .await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.bounded(key, async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| command_error(key, e))
        })
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.bounded("PING", async {
            let mut conn = self.connection().await?;
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(|_| ())
                .map_err(|e| command_error("PING", e))
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
