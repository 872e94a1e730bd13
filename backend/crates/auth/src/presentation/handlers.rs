//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use platform::bearer::extract_bearer;
use platform::rate_limit::MemoryRateLimitStore;
use platform::session_cache::SessionCache;

use crate::application::access_token::TokenIssuer;
use crate::application::config::AuthConfig;
use crate::application::{
    AdvisoryCache, Authenticator, LoginInput, LoginUseCase, LogoutUseCase, ProfileEditInput,
    ProfileUseCase, RefreshTokenManager, RegisterInput, RegisterUseCase,
};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::refresh_token::RawRefreshToken;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    LoginRequest, LoginResponse, MessageResponse, ProfileResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, RegisterResponse, UpdateProfileRequest,
};
use crate::presentation::extract::{AuthenticatedUser, JsonBody};

/// Shared state for auth handlers
pub struct AuthAppState<R, C> {
    pub repo: Arc<R>,
    pub cache: Arc<C>,
    pub issuer: Arc<TokenIssuer>,
    pub config: Arc<AuthConfig>,
    pub limiter: Arc<MemoryRateLimitStore>,
}

impl<R, C> Clone for AuthAppState<R, C> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            cache: self.cache.clone(),
            issuer: self.issuer.clone(),
            config: self.config.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

impl<R, C> AuthAppState<R, C>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    pub fn new(repo: R, cache: C, config: AuthConfig) -> Self {
        let issuer = TokenIssuer::new(&config.token_secret);
        Self {
            repo: Arc::new(repo),
            cache: Arc::new(cache),
            issuer: Arc::new(issuer),
            config: Arc::new(config),
            limiter: Arc::new(MemoryRateLimitStore::new()),
        }
    }

    pub fn advisory_cache(&self) -> AdvisoryCache<C> {
        AdvisoryCache::new(self.cache.clone())
    }

    pub fn authenticator(&self) -> Authenticator<C> {
        Authenticator::new(self.issuer.clone(), self.advisory_cache())
    }
}

// ============================================================================
// Register
// ============================================================================

/// POST /api/register
pub async fn register<R, C>(
    State(state): State<AuthAppState<R, C>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let use_case = RegisterUseCase::new(state.repo.clone(), state.config.clone());

    let output = use_case
        .execute(RegisterInput {
            username: req.username,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: output.username,
        }),
    ))
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/login
pub async fn login<R, C>(
    State(state): State<AuthAppState<R, C>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AuthResult<Json<LoginResponse>>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.issuer.clone(),
        state.advisory_cache(),
        state.config.clone(),
    );

    let output = use_case
        .execute(LoginInput {
            username: req.username,
            password: req.password,
        })
        .await?;

    Ok(Json(LoginResponse {
        token: output.token,
        refresh_token: output.refresh_token.expose().to_string(),
        userid: output.user_id.to_string(),
    }))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /api/logout
pub async fn logout<R, C>(
    State(state): State<AuthAppState<R, C>>,
    user: AuthenticatedUser,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let use_case = LogoutUseCase::new(
        state.repo.clone(),
        state.issuer.clone(),
        state.advisory_cache(),
        state.config.clone(),
    );

    use_case.execute(user.claims(), user.bearer_token()).await?;

    Ok(Json(MessageResponse::new("User logged out successfully")))
}

// ============================================================================
// Token Refresh
// ============================================================================

/// POST /api/token/refresh
///
/// The body is optional at the HTTP level; whether a refresh token is
/// required is a configuration decision made by the use case.
pub async fn refresh<R, C>(
    State(state): State<AuthAppState<R, C>>,
    headers: HeaderMap,
    body: Bytes,
) -> AuthResult<Json<RefreshResponse>>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let access_token = extract_bearer(&headers)?;
    let now = Utc::now();

    let manager = RefreshTokenManager::new(
        state.repo.clone(),
        state.issuer.clone(),
        state.advisory_cache(),
        state.config.clone(),
    );

    // The body is only decoded once the bearer is known to be good
    let claims = manager.check_renewable(access_token, now).await?;

    let req = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AuthError::InvalidInput(format!("Invalid JSON body: {e}")))?
    };

    let issued = manager
        .renew(
            claims,
            req.refresh_token.map(RawRefreshToken::presented),
            now,
        )
        .await?;

    Ok(Json(RefreshResponse {
        token: issued.token,
    }))
}

// ============================================================================
// Profile
// ============================================================================

/// GET /api/profile
pub async fn get_profile<R, C>(
    State(state): State<AuthAppState<R, C>>,
    user: AuthenticatedUser,
) -> AuthResult<Json<ProfileResponse>>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let use_case = ProfileUseCase::new(state.repo.clone(), state.advisory_cache());
    let profile = use_case.get(&user.user_id).await?;
    Ok(Json(profile.into()))
}

/// PUT /api/profile
pub async fn update_profile<R, C>(
    State(state): State<AuthAppState<R, C>>,
    user: AuthenticatedUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> AuthResult<Json<ProfileResponse>>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let use_case = ProfileUseCase::new(state.repo.clone(), state.advisory_cache());
    let profile = use_case
        .update(
            &user.user_id,
            ProfileEditInput {
                email: req.email,
                bio: req.bio,
            },
        )
        .await?;
    Ok(Json(profile.into()))
}

/// DELETE /api/profile
pub async fn delete_profile<R, C>(
    State(state): State<AuthAppState<R, C>>,
    user: AuthenticatedUser,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let use_case = ProfileUseCase::new(state.repo.clone(), state.advisory_cache());
    use_case.delete(user.claims(), user.bearer_token()).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// GET /api/user/{username}
pub async fn get_user_profile<R, C>(
    State(state): State<AuthAppState<R, C>>,
    Path(username): Path<String>,
) -> AuthResult<Json<ProfileResponse>>
where
    R: AuthStore,
    C: SessionCache + Send + Sync + 'static,
{
    let use_case = ProfileUseCase::new(state.repo.clone(), state.advisory_cache());
    let profile = use_case.get_by_username(&username).await?;
    Ok(Json(profile.into()))
}
