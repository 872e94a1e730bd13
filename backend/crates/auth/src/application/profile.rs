//! Profile Use Cases
//!
//! Read-through caching of `profile:{user_id}`, synchronous invalidation on
//! every write, and username lookup through the `username:` index.

use std::sync::Arc;

use chrono::Utc;
use platform::session_cache::SessionCache;

use crate::application::access_token::AccessClaims;
use crate::application::cache::{AdvisoryCache, PROFILE_CACHE_TTL, keys};
use crate::application::logout::revoke_access_token;
use crate::domain::entity::profile::{Profile, ProfileUpdate};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::{email::Email, user_id::UserId, user_name::UserName};
use crate::error::{AuthError, AuthResult};

pub const BIO_MAX_LENGTH: usize = 500;

/// Raw edit request; both fields optional
#[derive(Debug, Default)]
pub struct ProfileEditInput {
    pub email: Option<String>,
    pub bio: Option<String>,
}

impl ProfileEditInput {
    fn validate(self) -> AuthResult<ProfileUpdate> {
        let email = self
            .email
            .map(Email::new)
            .transpose()
            .map_err(AuthError::InvalidInput)?;

        let bio = self.bio.map(|b| b.trim().to_string());
        if let Some(bio) = &bio
            && bio.chars().count() > BIO_MAX_LENGTH
        {
            return Err(AuthError::InvalidInput(format!(
                "Bio must be at most {BIO_MAX_LENGTH} characters"
            )));
        }

        Ok(ProfileUpdate { email, bio })
    }
}

pub struct ProfileUseCase<R, C> {
    repo: Arc<R>,
    cache: AdvisoryCache<C>,
}

impl<R, C> ProfileUseCase<R, C>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, cache: AdvisoryCache<C>) -> Self {
        Self { repo, cache }
    }

    pub async fn get(&self, user_id: &UserId) -> AuthResult<Profile> {
        let key = keys::profile(user_id);

        if let Some(profile) = self.cache.get_json::<Profile>(&key).await
            && profile.user_id == *user_id
        {
            return Ok(profile);
        }

        let profile = self
            .repo
            .find_profile(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.cache
            .set_json(&key, &profile, Some(PROFILE_CACHE_TTL))
            .await;
        Ok(profile)
    }

    /// Public lookup. A username that cannot exist is simply not found.
    pub async fn get_by_username(&self, raw: &str) -> AuthResult<Profile> {
        let username = UserName::new(raw).map_err(|_| AuthError::UserNotFound)?;
        let index_key = keys::username(username.canonical());

        if let Some(user_id) = self
            .cache
            .get(&index_key)
            .await
            .and_then(|v| v.parse::<UserId>().ok())
        {
            match self.get(&user_id).await {
                Ok(profile) if profile.username.canonical() == username.canonical() => {
                    return Ok(profile);
                }
                Ok(_) | Err(AuthError::UserNotFound) => {
                    tracing::debug!(username = %username, "Stale username index entry");
                    self.cache.del(&index_key).await;
                }
                Err(e) => return Err(e),
            }
        }

        let record = self
            .repo
            .find_by_username(&username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.cache
            .set(&index_key, &record.user_id.to_string(), None)
            .await;

        self.get(&record.user_id).await
    }

    pub async fn update(&self, user_id: &UserId, input: ProfileEditInput) -> AuthResult<Profile> {
        let update = input.validate()?;

        let profile = self
            .repo
            .update_profile(user_id, update)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.cache.del(&keys::profile(user_id)).await;

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(profile)
    }

    /// Delete the account behind `claims` and retire the token used to do it
    pub async fn delete(&self, claims: &AccessClaims, token: &str) -> AuthResult<()> {
        let user_id = &claims.user_id;

        let record = self
            .repo
            .find_by_user_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.repo.delete(user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        self.cache.del(&keys::profile(user_id)).await;
        self.cache.del(&keys::token(user_id)).await;
        self.cache
            .del(&keys::username(record.username.canonical()))
            .await;
        revoke_access_token(&self.cache, claims, token, Utc::now()).await;

        tracing::info!(user_id = %user_id, "Account deleted");
        Ok(())
    }
}
