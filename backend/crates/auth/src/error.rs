//! Auth Error Types
//!
//! Auth-specific error variants that render through the unified
//! `kernel::error::AppError` problem document.
//!
//! Every variant has a *public* message. Credential and token failures share
//! generic wording so a client cannot tell which check failed; dependency
//! failures render generically and are logged with their cause.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

const TOKEN_REJECTED: &str = "Invalid or expired token";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed body or a value that fails validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Username already exists")]
    UsernameTaken,

    /// Unknown user or wrong password; deliberately one variant
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authorization header is missing")]
    MissingToken,

    #[error("Authorization header is not a bearer credential")]
    MalformedBearer,

    /// Bad signature, malformed structure or expired
    #[error("Access token failed verification")]
    InvalidToken,

    #[error("Access token was revoked by logout")]
    TokenRevoked,

    #[error("Refresh token missing, mismatched or expired")]
    InvalidRefreshToken,

    /// Rotation attempted while the access token still has plenty of life
    #[error("Token refresh not allowed yet")]
    RenewalNotYetAllowed,

    #[error("User not found")]
    UserNotFound,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// A store call did not finish within its deadline
    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidInput(_) => ErrorKind::BadRequest,
            AuthError::UsernameTaken => ErrorKind::Conflict,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::MalformedBearer
            | AuthError::InvalidToken
            | AuthError::TokenRevoked
            | AuthError::InvalidRefreshToken => ErrorKind::Unauthorized,
            AuthError::RenewalNotYetAllowed => ErrorKind::Forbidden,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::Database(_) | AuthError::Hashing(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
            AuthError::Timeout(_) => ErrorKind::ServiceUnavailable,
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidInput(msg) => msg.clone(),
            AuthError::UsernameTaken
            | AuthError::InvalidCredentials
            | AuthError::RenewalNotYetAllowed
            | AuthError::UserNotFound => self.to_string(),
            AuthError::MissingToken
            | AuthError::MalformedBearer
            | AuthError::InvalidToken
            | AuthError::TokenRevoked
            | AuthError::InvalidRefreshToken => TOKEN_REJECTED.to_string(),
            AuthError::RateLimited { .. } => "Too many requests, slow down".to_string(),
            AuthError::Database(_) | AuthError::Hashing(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
            AuthError::Timeout(_) => "Service temporarily unavailable".to_string(),
        }
    }

    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.public_message());
        match self {
            AuthError::RateLimited { retry_after_secs } => err.with_retry_after(*retry_after_secs),
            _ => err,
        }
    }

    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Hashing(msg) => {
                tracing::error!(message = %msg, "Password hashing error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::Timeout(op) => {
                tracing::error!(operation = op, "Auth dependency timed out");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::TokenRevoked => {
                tracing::warn!("Revoked access token presented");
            }
            AuthError::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Rate limit exceeded");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<platform::bearer::BearerError> for AuthError {
    fn from(err: platform::bearer::BearerError) -> Self {
        match err {
            platform::bearer::BearerError::Missing => AuthError::MissingToken,
            platform::bearer::BearerError::Malformed => AuthError::MalformedBearer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::UsernameTaken, StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::MissingToken, StatusCode::UNAUTHORIZED),
            (AuthError::RenewalNotYetAllowed, StatusCode::FORBIDDEN),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::RateLimited { retry_after_secs: 1 }, StatusCode::TOO_MANY_REQUESTS),
            (AuthError::Hashing("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::Timeout("credential store"), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_token_failures_share_one_message() {
        let messages: Vec<String> = [
            AuthError::MissingToken,
            AuthError::MalformedBearer,
            AuthError::InvalidToken,
            AuthError::TokenRevoked,
            AuthError::InvalidRefreshToken,
        ]
        .iter()
        .map(AuthError::public_message)
        .collect();
        assert!(messages.iter().all(|m| m == TOKEN_REJECTED));
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AuthError::Internal("pool exhausted on replica 3".into());
        let app = err.to_app_error();
        assert_eq!(app.message(), "Internal server error");
        assert!(!app.message().contains("replica"));
    }
}
