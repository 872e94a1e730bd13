//! `Authorization: Bearer <token>` extraction

use axum::http::{HeaderMap, header};

/// The scheme prefix, matched exactly (case and single space included).
pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    #[error("Authorization header is missing")]
    Missing,
    #[error("Authorization header is not a bearer credential")]
    Malformed,
}

/// Pull the raw token out of the `Authorization` header.
///
/// Fails fast: no header is [`BearerError::Missing`]; a header that is not
/// valid ASCII, lacks the exact `"Bearer "` prefix, or carries an empty
/// token is [`BearerError::Malformed`].
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, BearerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::Malformed)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(BearerError::Malformed)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(BearerError::Malformed);
    }
    Ok(token)
}
