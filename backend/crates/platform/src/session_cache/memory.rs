use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{CacheError, SessionCache};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache with TTL support.
///
/// Used in tests and when no Redis URL is configured. Expired entries are
/// dropped on access and swept on every write.
#[derive(Default)]
pub struct MemorySessionCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Backend("memory cache poisoned".into()))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|entries| entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for MemorySessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_owned(),
            expires_at: ttl.map(|ttl| now + ttl),
        };
        let mut entries = self.lock()?;
        // Keys that are never read again would otherwise stay forever
        entries.retain(|_, e| e.is_live(now));
        entries.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
