use std::future::Future;
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{CacheError, SessionCache};

/// Redis-backed cache.
///
/// `ConnectionManager` multiplexes one connection and reconnects on its own;
/// cloning it per call is cheap. Every command is bounded by `op_timeout`.
#[derive(Clone)]
pub struct RedisSessionCache {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisSessionCache {
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(CacheError::backend)?;
        let conn = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(CacheError::backend)?;

        tracing::info!(timeout_ms = op_timeout.as_millis() as u64, "Connected to Redis");
        Ok(Self { conn, op_timeout })
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(CacheError::backend)
    }
}

impl SessionCache for RedisSessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                self.bounded(async move { conn.pset_ex::<_, _, ()>(key, value, millis).await })
                    .await
            }
            None => {
                self.bounded(async move { conn.set::<_, _, ()>(key, value).await })
                    .await
            }
        }
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.del::<_, ()>(key).await })
            .await
    }
}
