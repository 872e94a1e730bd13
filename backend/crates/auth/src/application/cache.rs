//! Session cache glue
//!
//! [`AdvisoryCache`] wraps any [`SessionCache`] backend and makes it
//! impossible for a cache failure to fail a request: read errors become
//! misses, write and delete errors are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use platform::session_cache::SessionCache;
use serde::{Serialize, de::DeserializeOwned};

/// Bound on how stale a cached profile can get if an invalidation is lost
pub const PROFILE_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Key layout
pub mod keys {
    use crate::domain::value_object::user_id::UserId;

    /// Access token most recently issued to a user
    pub fn token(user_id: &UserId) -> String {
        format!("token:{user_id}")
    }

    /// Serialized [`Profile`](crate::domain::entity::profile::Profile)
    pub fn profile(user_id: &UserId) -> String {
        format!("profile:{user_id}")
    }

    /// Canonical username to user id
    pub fn username(canonical: &str) -> String {
        format!("username:{canonical}")
    }

    /// Logout denylist entry. Keyed by digest so raw tokens never land in
    /// the cache keyspace.
    pub fn revoked(token: &str) -> String {
        format!("revoked:{}", platform::crypto::sha256_hex(token.as_bytes()))
    }
}

pub struct AdvisoryCache<C> {
    inner: Arc<C>,
}

impl<C> Clone for AdvisoryCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> AdvisoryCache<C>
where
    C: SessionCache + Send + Sync + 'static,
{
    pub fn new(inner: Arc<C>) -> Self {
        Self { inner }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        match self.inner.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        if let Err(e) = self.inner.set(key, value, ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    pub async fn del(&self, key: &str) {
        if let Err(e) = self.inner.del(key).await {
            tracing::warn!(key, error = %e, "Cache invalidation failed");
        }
    }

    /// An entry that no longer deserializes is dropped and reported as a miss
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                self.del(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "Cache entry not serializable"),
        }
    }
}
