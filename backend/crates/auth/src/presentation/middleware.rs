//! Auth Middleware
//!
//! `require_bearer` gates protected routes; `rate_limit` throttles the
//! credential endpoints per client IP.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use platform::bearer::extract_bearer;
use platform::client::extract_client_ip;
use platform::rate_limit::RateLimitStore;
use platform::session_cache::SessionCache;

use crate::domain::repository::AuthStore;
use crate::error::AuthError;
use crate::presentation::extract::AuthenticatedUser;
use crate::presentation::handlers::AuthAppState;

/// Reject unless the request carries a valid, unrevoked bearer token.
/// On success the caller is available to handlers as [`AuthenticatedUser`].
pub async fn require_bearer<R, C>(
    State(state): State<AuthAppState<R, C>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let token = extract_bearer(req.headers())?.to_string();
    let claims = state.authenticator().authenticate(&token).await?;

    req.extensions_mut()
        .insert(AuthenticatedUser::new(claims, token));

    Ok(next.run(req).await)
}

/// Fixed-window limit keyed on the client IP. A failing limiter lets the
/// request through.
pub async fn rate_limit<R, C>(
    State(state): State<AuthAppState<R, C>>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    let client = extract_client_ip(req.headers(), peer_ip)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("auth:{client}");

    match state
        .limiter
        .check_and_increment(&key, &state.config.rate_limit)
        .await
    {
        Ok(result) if !result.allowed => Err(AuthError::RateLimited {
            retry_after_secs: result.reset_after.as_secs().max(1),
        }),
        Ok(_) => Ok(next.run(req).await),
        Err(e) => {
            tracing::error!(error = %e, "Rate limiter unavailable, allowing request");
            Ok(next.run(req).await)
        }
    }
}
