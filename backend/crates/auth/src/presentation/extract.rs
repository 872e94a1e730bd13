//! Request Extractors

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use chrono::{DateTime, Utc};

use crate::application::access_token::AccessClaims;
use crate::domain::value_object::user_id::UserId;
use crate::error::AuthError;

/// `axum::Json` whose rejection renders as a 400 problem document
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidInput(rejection.body_text())
    }
}

/// Caller identity placed in request extensions by
/// [`require_bearer`](super::middleware::require_bearer).
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub expires_at: DateTime<Utc>,
    claims: AccessClaims,
    token: String,
}

impl AuthenticatedUser {
    pub(crate) fn new(claims: AccessClaims, token: String) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username.clone(),
            expires_at: claims.expires_at(),
            claims,
            token,
        }
    }

    pub fn claims(&self) -> &AccessClaims {
        &self.claims
    }

    /// The raw bearer token the request was authenticated with
    pub fn bearer_token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("expires_at", &self.expires_at)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Only succeeds behind `require_bearer`; anywhere else it is a 401.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}
