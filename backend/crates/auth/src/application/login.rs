//! Login Use Case
//!
//! Verifies a username and password and hands out an access token plus a
//! refresh token.
//!
//! Unknown username, unusable username and wrong password all end in the
//! same [`AuthError::InvalidCredentials`], and all of them pay for one
//! Argon2 computation so response timing does not reveal which it was.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::session_cache::SessionCache;

use crate::application::access_token::TokenIssuer;
use crate::application::authenticate::Authenticator;
use crate::application::cache::{AdvisoryCache, keys};
use crate::application::config::AuthConfig;
use crate::application::refresh_tokens::RefreshTokenManager;
use crate::application::register::hash_password;
use crate::domain::entity::credential::CredentialRecord;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{
    refresh_token::RawRefreshToken,
    user_id::UserId,
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct LoginOutput {
    pub token: String,
    pub refresh_token: RawRefreshToken,
    pub user_id: UserId,
}

enum Verified {
    Mismatch,
    Match,
    Rehashed(UserPassword),
}

pub struct LoginUseCase<R, C> {
    repo: Arc<R>,
    issuer: Arc<TokenIssuer>,
    cache: AdvisoryCache<C>,
    config: Arc<AuthConfig>,
}

impl<R, C> LoginUseCase<R, C>
where
    R: CredentialRepository + Send + Sync + 'static,
    C: SessionCache + Send + Sync + 'static,
{
    pub fn new(
        repo: Arc<R>,
        issuer: Arc<TokenIssuer>,
        cache: AdvisoryCache<C>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            repo,
            issuer,
            cache,
            config,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        let password = RawPassword::for_login(input.password);

        let record = match UserName::new(&input.username) {
            Ok(username) => self.repo.find_by_username(&username).await?,
            Err(_) => None,
        };

        let Some(record) = record else {
            // Burn the same work a real verification would
            let _ = hash_password(password, &self.config).await;
            return Err(AuthError::InvalidCredentials);
        };

        let now = Utc::now();

        match self.verify_password(record.password_hash.clone(), password).await? {
            Verified::Mismatch => {
                tracing::warn!(user_id = %record.user_id, "Password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            Verified::Match => {}
            Verified::Rehashed(upgraded) => {
                // The login itself already succeeded; a failed upgrade is retried next time
                match self.repo.update_password_hash(&record.user_id, &upgraded, now).await {
                    Ok(()) => tracing::info!(user_id = %record.user_id, "Password hash upgraded"),
                    Err(e) => {
                        tracing::warn!(user_id = %record.user_id, error = %e, "Password rehash not stored")
                    }
                }
            }
        }

        let token = self.reuse_or_issue(&record, now).await?;

        let refresh_tokens = RefreshTokenManager::new(
            self.repo.clone(),
            self.issuer.clone(),
            self.cache.clone(),
            self.config.clone(),
        );
        let refresh_token = refresh_tokens.issue_and_store(&record.user_id, now).await?;

        self.cache
            .set(
                &keys::username(record.username.canonical()),
                &record.user_id.to_string(),
                None,
            )
            .await;

        tracing::info!(
            user_id = %record.user_id,
            username = %record.username,
            "User logged in"
        );

        Ok(LoginOutput {
            token,
            refresh_token,
            user_id: record.user_id,
        })
    }

    /// Verification and, when the stored hash predates the current hashing
    /// policy, the replacement hash. Both run on the blocking pool.
    async fn verify_password(&self, stored: UserPassword, password: RawPassword) -> AuthResult<Verified> {
        let pepper = self.config.password_pepper.clone();
        let policy = self.config.hashing;

        tokio::task::spawn_blocking(move || {
            if !stored.verify(&password, pepper.as_deref()) {
                return Verified::Mismatch;
            }
            if !stored.needs_rehash(&policy) {
                return Verified::Match;
            }
            match UserPassword::from_raw(&password, pepper.as_deref(), &policy) {
                Ok(upgraded) => Verified::Rehashed(upgraded),
                Err(e) => {
                    tracing::warn!(error = %e, "Rehash failed");
                    Verified::Match
                }
            }
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))
    }

    /// The cached token is handed out again if it still verifies, belongs to
    /// this user and has enough life left. Otherwise a new one is signed and
    /// cached for its full lifetime.
    async fn reuse_or_issue(&self, record: &CredentialRecord, now: DateTime<Utc>) -> AuthResult<String> {
        let key = keys::token(&record.user_id);

        if let Some(cached) = self.cache.get(&key).await {
            let authenticator = Authenticator::new(self.issuer.clone(), self.cache.clone());
            match authenticator.authenticate_at(&cached, now).await {
                Ok(claims)
                    if claims.user_id == record.user_id
                        && claims.remaining(now) >= self.config.cached_token_min_remaining =>
                {
                    tracing::debug!(user_id = %record.user_id, "Reusing cached access token");
                    return Ok(cached);
                }
                _ => {}
            }
        }

        let issued = self.issuer.issue_at(
            record.user_id,
            record.username.original(),
            self.config.access_token_ttl,
            now,
        )?;
        self.cache
            .set(&key, &issued.token, Some(self.config.access_token_ttl))
            .await;

        Ok(issued.token)
    }
}
