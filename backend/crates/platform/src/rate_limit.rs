//! Rate Limiting Infrastructure
//!
//! Fixed-window counters keyed by an arbitrary string (usually client IP).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the current window closes
    pub reset_after: Duration,
}

pub type RateLimitError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count one request against `key` and report whether it is allowed.
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError>;
}

struct Window {
    started: Instant,
    count: u32,
}

/// In-process fixed-window store.
///
/// Counters are per process; behind several replicas each one enforces its
/// own budget.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_at(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now: Instant,
    ) -> Result<RateLimitResult, RateLimitError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| "rate limit state poisoned")?;

        // Drop closed windows so the map does not grow without bound
        windows.retain(|_, w| now.duration_since(w.started) < config.window);

        let window = windows.entry(key.to_owned()).or_insert(Window {
            started: now,
            count: 0,
        });
        window.count = window.count.saturating_add(1);

        let reset_after = config
            .window
            .saturating_sub(now.duration_since(window.started));

        Ok(RateLimitResult {
            allowed: window.count <= config.max_requests,
            remaining: config.max_requests.saturating_sub(window.count),
            reset_after,
        })
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError> {
        self.check_at(key, config, Instant::now())
    }
}
