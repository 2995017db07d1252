use super::CoordinationStore;
use crate::error::StoreError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed coordination store.
///
/// Uses a `ConnectionManager`, which transparently reconnects on transport
/// failure — a single hiccup degrades one call rather than poisoning the
/// whole client for the process lifetime.
pub struct RedisStore {
    manager: ConnectionManager,
    command_timeout: Duration,
}

impl RedisStore {
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_string)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            manager,
            // Per-command timeout; connect-level timeout is handled by
            // `ConnectionManager` itself.
            command_timeout: Duration::from_millis(1000),
        })
    }

    async fn with_timeout<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Connection(e.to_string())),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        self.with_timeout(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        self.with_timeout(conn.set_ex(key, value, seconds)).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut conn = self.manager.clone();
        self.with_timeout(conn.incr(key, delta)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        self.with_timeout(conn.del(key)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        self.with_timeout(redis::cmd("PING").query_async(&mut conn))
            .await
    }
}
