//! Repository Traits
//!
//! Interfaces for the credential store of record. Implementations live in the
//! infrastructure layer.
//!
//! Uniqueness of usernames is enforced by the store itself: `create` must
//! fail with [`AuthError::UsernameTaken`](crate::error::AuthError::UsernameTaken)
//! on a duplicate canonical username, atomically, regardless of any
//! existence check a caller did beforehand.

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    credential::{CredentialRecord, StoredRefreshToken},
    profile::{Profile, ProfileUpdate},
};
use crate::domain::value_object::{
    user_id::UserId, user_name::UserName, user_password::UserPassword,
};
use crate::error::AuthResult;

#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    /// Insert the credential record and its empty profile together
    async fn create(&self, record: &CredentialRecord) -> AuthResult<()>;

    /// Lookup by canonical username
    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<CredentialRecord>>;

    async fn find_by_user_id(&self, user_id: &UserId) -> AuthResult<Option<CredentialRecord>>;

    /// Fast-path duplicate check; not a correctness guarantee
    async fn exists_by_username(&self, username: &UserName) -> AuthResult<bool>;

    /// Replace the stored refresh-token digest and expiry
    async fn store_refresh_token(
        &self,
        user_id: &UserId,
        token: &StoredRefreshToken,
        now: DateTime<Utc>,
    ) -> AuthResult<()>;

    async fn clear_refresh_token(&self, user_id: &UserId, now: DateTime<Utc>) -> AuthResult<()>;

    /// Replace the password hash, e.g. after the hashing policy changed
    async fn update_password_hash(
        &self,
        user_id: &UserId,
        password_hash: &UserPassword,
        now: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Remove the account. Returns `false` when nothing was deleted.
    async fn delete(&self, user_id: &UserId) -> AuthResult<bool>;
}

#[trait_variant::make(ProfileRepository: Send)]
pub trait LocalProfileRepository {
    async fn find_profile(&self, user_id: &UserId) -> AuthResult<Option<Profile>>;

    /// Returns the updated profile, or `None` if the account is gone
    async fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> AuthResult<Option<Profile>>;
}

/// Everything the auth routes need from one store handle
pub trait AuthStore: CredentialRepository + ProfileRepository + Send + Sync + 'static {}

impl<T> AuthStore for T where T: CredentialRepository + ProfileRepository + Send + Sync + 'static {}
