//! Credential Record
//!
//! What the store of record keeps per account: the username, the password
//! hash and, after a login, the digest of the outstanding refresh token.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    refresh_token::RefreshTokenHash, user_id::UserId, user_name::UserName,
    user_password::UserPassword,
};

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub username: UserName,
    pub password_hash: UserPassword,
    /// Set at login, cleared at logout
    pub refresh_token: Option<StoredRefreshToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// A new account with a server-generated id and no refresh token yet
    pub fn new(username: UserName, password_hash: UserPassword) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            username,
            password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Digest and absolute expiry of the refresh token last issued to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRefreshToken {
    pub hash: RefreshTokenHash,
    pub expires_at: DateTime<Utc>,
}

impl StoredRefreshToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
