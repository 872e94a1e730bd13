//! Refresh Token Value Objects
//!
//! The raw token is 32 CSPRNG bytes as lowercase hex and is handed to the
//! client exactly once. Only its SHA-256 digest is ever persisted; the
//! token's own entropy is what protects it, so a fast digest is enough.

use platform::crypto;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Entropy of a freshly generated refresh token, in bytes
pub const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RawRefreshToken(String);

impl RawRefreshToken {
    pub fn generate() -> Self {
        Self(crypto::random_hex(REFRESH_TOKEN_BYTES))
    }

    /// Value presented by a client
    pub fn presented(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> RefreshTokenHash {
        RefreshTokenHash::of(self)
    }
}

impl fmt::Debug for RawRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawRefreshToken").field(&"[REDACTED]").finish()
    }
}

/// Hex SHA-256 digest of a refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenHash(String);

impl RefreshTokenHash {
    pub fn of(raw: &RawRefreshToken) -> Self {
        Self(crypto::sha256_hex(raw.0.as_bytes()))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time equality
    pub fn matches(&self, other: &RefreshTokenHash) -> bool {
        crypto::constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
    }
}
