//! Auth Router
//!
//! Paths are relative; the application nests this router under `/api`.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use platform::session_cache::{RedisSessionCache, SessionCache};

use crate::application::config::AuthConfig;
use crate::domain::repository::AuthStore;
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{rate_limit, require_bearer};

/// Create the Auth router with PostgreSQL and Redis
pub fn auth_router(repo: PgAuthRepository, cache: RedisSessionCache, config: AuthConfig) -> Router {
    auth_router_generic(repo, cache, config)
}

/// Create a generic Auth router for any store and cache implementation
pub fn auth_router_generic<R, C>(repo: R, cache: C, config: AuthConfig) -> Router
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    build(AuthAppState::new(repo, cache, config))
}

pub(crate) fn build<R, C>(state: AuthAppState<R, C>) -> Router
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let throttled = Router::new()
        .route("/register", post(handlers::register::<R, C>))
        .route("/login", post(handlers::login::<R, C>))
        .route("/token/refresh", post(handlers::refresh::<R, C>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::<R, C>,
        ));

    let protected = Router::new()
        .route("/logout", post(handlers::logout::<R, C>))
        .route(
            "/profile",
            get(handlers::get_profile::<R, C>)
                .put(handlers::update_profile::<R, C>)
                .delete(handlers::delete_profile::<R, C>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer::<R, C>,
        ));

    let public = Router::new().route("/user/{username}", get(handlers::get_user_profile::<R, C>));

    Router::new()
        .merge(throttled)
        .merge(protected)
        .merge(public)
        .with_state(state)
}
