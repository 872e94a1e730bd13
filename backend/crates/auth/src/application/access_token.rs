//! Access Token Issuer / Verifier
//!
//! HS256 JWTs carrying `{userId, username, iat, exp}`. Validity is signature
//! plus expiry, nothing else; no server-side state is consulted here.
//!
//! Every verification failure (bad signature, wrong algorithm, malformed
//! structure, expired) collapses into [`AuthError::InvalidToken`].

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::application::config::{TokenSecret, delta};
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub username: String,
    /// Seconds since the epoch
    pub iat: i64,
    /// Seconds since the epoch
    pub exp: i64,
}

impl AccessClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Lifetime left at `now`; zero once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at() - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// A freshly signed token and the claims inside it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AccessClaims,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &TokenSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against an explicit `now` in `verify_at`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user_id: UserId, username: &str, ttl: Duration) -> AuthResult<IssuedToken> {
        self.issue_at(user_id, username, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: UserId,
        username: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let claims = AccessClaims {
            user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + delta(ttl)).timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))?;

        Ok(IssuedToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> AuthResult<AccessClaims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<AccessClaims> {
        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthError::InvalidToken
            })?;

        if data.claims.is_expired_at(now) {
            tracing::debug!(exp = data.claims.exp, "Access token expired");
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}
