//! Session Cache
//!
//! A small key/value contract (`get`/`set`/`del` with optional TTL) for soft
//! state: cached tokens, serialized profiles, secondary indexes. Nothing
//! stored here is authoritative. Callers must treat a miss and an error the
//! same way, by going back to the store of record.

mod memory;
mod redis_store;

pub use self::memory::MemorySessionCache;
pub use self::redis_store::RedisSessionCache;

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache operation timed out")]
    Timeout,
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[trait_variant::make(SessionCache: Send)]
pub trait LocalSessionCache {
    /// `Ok(None)` on a miss or an expired entry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Insert or overwrite. `ttl = None` keeps the entry until deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove `key`. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}
