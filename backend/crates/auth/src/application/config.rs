//! Application Configuration
//!
//! Configuration for the Auth application layer. Built once at start-up and
//! shared behind an `Arc`; nothing in here changes while the process runs.

use std::fmt;
use std::time::Duration;

use chrono::TimeDelta;
use platform::password::HashingPolicy;
use platform::rate_limit::RateLimitConfig;

/// Minimum accepted HMAC key size
pub const MIN_SECRET_LEN: usize = 32;

/// Symmetric key for signing access tokens
#[derive(Clone)]
pub struct TokenSecret(Vec<u8>);

impl TokenSecret {
    pub fn new(bytes: Vec<u8>) -> Result<Self, String> {
        if bytes.len() < MIN_SECRET_LEN {
            return Err(format!(
                "token secret must be at least {MIN_SECRET_LEN} bytes (got {})",
                bytes.len()
            ));
        }
        Ok(Self(bytes))
    }

    pub fn random() -> Self {
        Self(platform::crypto::random_bytes(MIN_SECRET_LEN))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret([REDACTED])")
    }
}

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_secret: TokenSecret,
    /// Lifetime of tokens issued at login (15 minutes)
    pub access_token_ttl: Duration,
    /// Lifetime of tokens reissued by the refresh endpoint (72 hours)
    pub renewal_ttl: Duration,
    /// Refresh is only allowed once less than this much lifetime remains (30 minutes)
    pub renewal_threshold: Duration,
    /// Lifetime of refresh tokens (7 days)
    pub refresh_token_ttl: Duration,
    /// A cached token is handed out again on re-login only if it has at
    /// least this much lifetime left
    pub cached_token_min_remaining: Duration,
    /// Whether `/token/refresh` also demands the refresh token
    pub require_refresh_token: bool,
    pub hashing: HashingPolicy,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Applied per client IP on register, login and refresh
    pub rate_limit: RateLimitConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: TokenSecret::random(),
            access_token_ttl: Duration::from_secs(15 * 60),
            renewal_ttl: Duration::from_secs(72 * 3600),
            renewal_threshold: Duration::from_secs(30 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600),
            cached_token_min_remaining: Duration::from_secs(5 * 60),
            require_refresh_token: true,
            hashing: HashingPolicy::default(),
            password_pepper: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn with_secret(token_secret: TokenSecret) -> Self {
        Self {
            token_secret,
            ..Default::default()
        }
    }

    /// Random signing secret; tokens do not survive a restart
    pub fn with_random_secret() -> Self {
        Self::with_secret(TokenSecret::random())
    }

    /// Random secret and a relaxed rate limit
    pub fn development() -> Self {
        Self {
            rate_limit: RateLimitConfig::new(100, 60),
            ..Self::with_random_secret()
        }
    }

    /// Cheap hashing so tests stay fast
    #[cfg(test)]
    pub(crate) fn testing() -> Self {
        Self {
            hashing: HashingPolicy::minimal(),
            rate_limit: RateLimitConfig::new(1000, 60),
            ..Self::with_random_secret()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

/// `std` duration as a chrono delta. Out-of-range values collapse to zero,
/// which makes anything derived from them expire immediately.
pub(crate) fn delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::zero())
}
