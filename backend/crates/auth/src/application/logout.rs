//! Logout Use Case
//!
//! Ends the caller's session: drops the cached token, denylists the
//! presented access token for the rest of its lifetime and clears the stored
//! refresh token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::session_cache::SessionCache;

use crate::application::access_token::{AccessClaims, TokenIssuer};
use crate::application::cache::{AdvisoryCache, keys};
use crate::application::config::AuthConfig;
use crate::application::refresh_tokens::RefreshTokenManager;
use crate::domain::repository::CredentialRepository;
use crate::error::AuthResult;

pub struct LogoutUseCase<R, C> {
    repo: Arc<R>,
    issuer: Arc<TokenIssuer>,
    cache: AdvisoryCache<C>,
    config: Arc<AuthConfig>,
}

impl<R, C> LogoutUseCase<R, C>
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

    pub async fn execute(&self, claims: &AccessClaims, token: &str) -> AuthResult<()> {
        self.execute_at(claims, token, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        claims: &AccessClaims,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        // Cache side first: the presented token is dead even if the store
        // call below fails
        self.cache.del(&keys::token(&claims.user_id)).await;
        revoke_access_token(&self.cache, claims, token, now).await;

        RefreshTokenManager::new(
            self.repo.clone(),
            self.issuer.clone(),
            self.cache.clone(),
            self.config.clone(),
        )
        .revoke(&claims.user_id, now)
        .await?;

        tracing::info!(user_id = %claims.user_id, "User logged out");
        Ok(())
    }
}

/// Denylist `token` until it would have expired anyway
pub(crate) async fn revoke_access_token<C>(
    cache: &AdvisoryCache<C>,
    claims: &AccessClaims,
    token: &str,
    now: DateTime<Utc>,
) where
    C: SessionCache + Send + Sync + 'static,
{
    let remaining = claims.remaining(now);
    if !remaining.is_zero() {
        cache.set(&keys::revoked(token), "1", Some(remaining)).await;
    }
}
