//! Refresh Token Manager
//!
//! Issues, validates and revokes the opaque refresh token, and performs
//! access-token rotation.
//!
//! Only the SHA-256 digest of a refresh token is persisted. Rotation is
//! allowed once the presented access token is inside its renewal window, and
//! (unless disabled) only together with the user's current refresh token.
//! The refresh token itself is not rotated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::session_cache::SessionCache;

use crate::application::access_token::{AccessClaims, IssuedToken, TokenIssuer};
use crate::application::authenticate::Authenticator;
use crate::application::cache::{AdvisoryCache, keys};
use crate::application::config::{AuthConfig, delta};
use crate::domain::entity::credential::StoredRefreshToken;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{refresh_token::RawRefreshToken, user_id::UserId};
use crate::error::{AuthError, AuthResult};

pub struct RefreshTokenManager<R, C> {
    repo: Arc<R>,
    issuer: Arc<TokenIssuer>,
    cache: AdvisoryCache<C>,
    config: Arc<AuthConfig>,
}

impl<R, C> RefreshTokenManager<R, C>
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

    /// Generate a token, persist its digest and return the raw value. The
    /// raw value is never stored.
    pub async fn issue_and_store(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AuthResult<RawRefreshToken> {
        let raw = RawRefreshToken::generate();
        let stored = StoredRefreshToken {
            hash: raw.digest(),
            expires_at: now + delta(self.config.refresh_token_ttl),
        };
        self.repo.store_refresh_token(user_id, &stored, now).await?;
        Ok(raw)
    }

    pub async fn validate(
        &self,
        user_id: &UserId,
        presented: &RawRefreshToken,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        let record = self
            .repo
            .find_by_user_id(user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let Some(stored) = record.refresh_token else {
            return Err(AuthError::InvalidRefreshToken);
        };

        // Digest comparison first so a mismatch and an expired token cost the same
        let matches = stored.hash.matches(&presented.digest());
        if !matches || stored.is_expired_at(now) {
            tracing::warn!(user_id = %user_id, "Refresh token rejected");
            return Err(AuthError::InvalidRefreshToken);
        }
        Ok(())
    }

    pub async fn revoke(&self, user_id: &UserId, now: DateTime<Utc>) -> AuthResult<()> {
        self.repo.clear_refresh_token(user_id, now).await
    }

    /// Exchange an access token close to expiry for a fresh one with the
    /// renewal lifetime.
    pub async fn rotate(
        &self,
        access_token: &str,
        presented: Option<RawRefreshToken>,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let claims = self.check_renewable(access_token, now).await?;
        self.renew(claims, presented, now).await
    }

    /// Bearer and renewal-window checks. Runs before anything the caller
    /// sent besides the access token is looked at.
    pub async fn check_renewable(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<AccessClaims> {
        let claims = Authenticator::new(self.issuer.clone(), self.cache.clone())
            .authenticate_at(access_token, now)
            .await?;

        if claims.remaining(now) >= self.config.renewal_threshold {
            return Err(AuthError::RenewalNotYetAllowed);
        }
        Ok(claims)
    }

    /// Second half of [`rotate`](Self::rotate), for claims that already
    /// passed [`check_renewable`](Self::check_renewable).
    pub async fn renew(
        &self,
        claims: AccessClaims,
        presented: Option<RawRefreshToken>,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        if self.config.require_refresh_token {
            let presented = presented.ok_or(AuthError::InvalidRefreshToken)?;
            self.validate(&claims.user_id, &presented, now).await?;
        }

        let issued = self.issuer.issue_at(
            claims.user_id,
            &claims.username,
            self.config.renewal_ttl,
            now,
        )?;

        self.cache
            .set(
                &keys::token(&claims.user_id),
                &issued.token,
                Some(self.config.renewal_ttl),
            )
            .await;

        tracing::info!(user_id = %claims.user_id, "Access token renewed");

        Ok(issued)
    }
}
