//! Bearer token authentication
//!
//! Signature and expiry first, then the logout denylist. The denylist is
//! advisory like the rest of the cache: if the cache is down, a token that
//! verifies is accepted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::session_cache::SessionCache;

use crate::application::access_token::{AccessClaims, TokenIssuer};
use crate::application::cache::{AdvisoryCache, keys};
use crate::error::{AuthError, AuthResult};

pub struct Authenticator<C> {
    issuer: Arc<TokenIssuer>,
    cache: AdvisoryCache<C>,
}

impl<C> Clone for Authenticator<C> {
    fn clone(&self) -> Self {
        Self {
            issuer: self.issuer.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<C> Authenticator<C>
where
    C: SessionCache + Send + Sync + 'static,
{
    pub fn new(issuer: Arc<TokenIssuer>, cache: AdvisoryCache<C>) -> Self {
        Self { issuer, cache }
    }

    pub async fn authenticate(&self, token: &str) -> AuthResult<AccessClaims> {
        self.authenticate_at(token, Utc::now()).await
    }

    pub async fn authenticate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<AccessClaims> {
        let claims = self.issuer.verify_at(token, now)?;

        if self.cache.get(&keys::revoked(token)).await.is_some() {
            return Err(AuthError::TokenRevoked);
        }
        Ok(claims)
    }
}
