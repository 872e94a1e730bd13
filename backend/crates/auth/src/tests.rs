//! Crate-level tests: use-case flows against the in-memory store, and the
//! full HTTP surface through the router.

#[cfg(test)]
mod support {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;
    use chrono::{DateTime, Utc};
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode, header};
    use platform::rate_limit::MemoryRateLimitStore;
    use platform::session_cache::{CacheError, MemorySessionCache, SessionCache};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::application::access_token::TokenIssuer;
    use crate::application::cache::AdvisoryCache;
    use crate::application::config::AuthConfig;
    use crate::domain::entity::credential::{CredentialRecord, StoredRefreshToken};
    use crate::domain::repository::CredentialRepository;
    use crate::domain::value_object::{
        user_id::UserId, user_name::UserName, user_password::UserPassword,
    };
    use crate::error::{AuthError, AuthResult};
    use crate::infra::memory::MemoryAuthRepository;
    use crate::presentation::handlers::AuthAppState;
    use crate::presentation::router;

    pub const PASSWORD: &str = "Secr3t!";

    /// In-memory store whose refresh-token clear always fails
    pub struct StuckRefreshStore(pub Arc<MemoryAuthRepository>);

    impl CredentialRepository for StuckRefreshStore {
        async fn create(&self, record: &CredentialRecord) -> AuthResult<()> {
            self.0.create(record).await
        }

        async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<CredentialRecord>> {
            self.0.find_by_username(username).await
        }

        async fn find_by_user_id(&self, user_id: &UserId) -> AuthResult<Option<CredentialRecord>> {
            self.0.find_by_user_id(user_id).await
        }

        async fn exists_by_username(&self, username: &UserName) -> AuthResult<bool> {
            self.0.exists_by_username(username).await
        }

        async fn store_refresh_token(
            &self,
            user_id: &UserId,
            token: &StoredRefreshToken,
            now: DateTime<Utc>,
        ) -> AuthResult<()> {
            self.0.store_refresh_token(user_id, token, now).await
        }

        async fn clear_refresh_token(&self, _user_id: &UserId, _now: DateTime<Utc>) -> AuthResult<()> {
            Err(AuthError::Timeout("credential store"))
        }

        async fn update_password_hash(
            &self,
            user_id: &UserId,
            password_hash: &UserPassword,
            now: DateTime<Utc>,
        ) -> AuthResult<()> {
            self.0.update_password_hash(user_id, password_hash, now).await
        }

        async fn delete(&self, user_id: &UserId) -> AuthResult<bool> {
            self.0.delete(user_id).await
        }
    }

    /// Backend that fails every call
    pub struct FailingSessionCache;

    impl SessionCache for FailingSessionCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            Err(CacheError::Timeout)
        }

        async fn del(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    pub struct Harness<C> {
        pub repo: Arc<MemoryAuthRepository>,
        pub cache: Arc<C>,
        pub issuer: Arc<TokenIssuer>,
        pub config: Arc<AuthConfig>,
        pub state: AuthAppState<MemoryAuthRepository, C>,
    }

    impl<C> Harness<C>
    where
        C: SessionCache + Send + Sync + 'static,
    {
        pub fn with(cache: C, config: AuthConfig) -> Self {
            let repo = Arc::new(MemoryAuthRepository::new());
            let cache = Arc::new(cache);
            let issuer = Arc::new(TokenIssuer::new(&config.token_secret));
            let config = Arc::new(config);
            let state = AuthAppState {
                repo: repo.clone(),
                cache: cache.clone(),
                issuer: issuer.clone(),
                config: config.clone(),
                limiter: Arc::new(MemoryRateLimitStore::new()),
            };
            Self {
                repo,
                cache,
                issuer,
                config,
                state,
            }
        }

        pub fn advisory(&self) -> AdvisoryCache<C> {
            AdvisoryCache::new(self.cache.clone())
        }

        pub fn app(&self) -> Router {
            router::build(self.state.clone())
        }
    }

    impl Harness<MemorySessionCache> {
        pub fn new() -> Self {
            Self::with(MemorySessionCache::new(), AuthConfig::testing())
        }
    }

    pub struct TestResponse {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: Value,
    }

    pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub fn json_request(method: &str, uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub fn bare_request(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Register then log in; returns `(token, refreshToken, userid)`
    pub async fn register_and_login(app: &Router, username: &str) -> (String, String, String) {
        let creds = serde_json::json!({"username": username, "password": PASSWORD});

        let res = send(app, json_request("POST", "/register", creds.clone(), None)).await;
        assert_eq!(res.status, StatusCode::CREATED);

        let res = send(app, json_request("POST", "/login", creds, None)).await;
        assert_eq!(res.status, StatusCode::OK);

        (
            res.body["token"].as_str().unwrap().to_string(),
            res.body["refreshToken"].as_str().unwrap().to_string(),
            res.body["userid"].as_str().unwrap().to_string(),
        )
    }
}

#[cfg(test)]
mod flow_tests {
    use std::time::Duration;

    use chrono::Utc;
    use platform::session_cache::SessionCache;

    use super::support::*;
    use crate::application::cache::keys;
    use crate::application::{
        Authenticator, LoginInput, LoginUseCase, LogoutUseCase, RefreshTokenManager,
        RegisterInput, RegisterUseCase,
    };
    use crate::domain::repository::CredentialRepository;
    use crate::domain::value_object::{refresh_token::RawRefreshToken, user_name::UserName};
    use crate::error::AuthError;

    fn input(username: &str, password: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn login_input(username: &str, password: &str) -> LoginInput {
        LoginInput {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_echoes_original_spelling() {
        let h = Harness::new();
        let register = RegisterUseCase::new(h.repo.clone(), h.config.clone());

        let output = register.execute(input("Carol_99", PASSWORD)).await.unwrap();
        assert_eq!(output.username, "Carol_99");

        let err = register.execute(input("carol_99", PASSWORD)).await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let h = Harness::new();
        let register = RegisterUseCase::new(h.repo.clone(), h.config.clone());

        for (username, password) in [("ab", PASSWORD), ("alice", "abc"), ("alice", "")] {
            let err = register.execute(input(username, password)).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidInput(_)), "{username}/{password}");
        }
        assert!(h.repo.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_has_one_winner() {
        let h = Harness::new();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let register = RegisterUseCase::new(h.repo.clone(), h.config.clone());
                tokio::spawn(async move { register.execute(input("alice", PASSWORD)).await })
            })
            .collect();

        let mut created = 0;
        let mut taken = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(AuthError::UsernameTaken) => taken += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(taken, 7);
        assert_eq!(h.repo.len(), 1);
    }

    #[tokio::test]
    async fn test_login_stores_only_the_refresh_token_digest() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();

        let output = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(login_input("alice", PASSWORD))
            .await
            .unwrap();

        assert!(!output.token.is_empty());
        assert_eq!(output.refresh_token.expose().len(), 64);

        let record = h.repo.find_by_user_id(&output.user_id).await.unwrap().unwrap();
        let stored = record.refresh_token.unwrap();
        assert_ne!(stored.hash.as_str(), output.refresh_token.expose());
        assert_eq!(
            stored.hash.as_str(),
            platform::crypto::sha256_hex(output.refresh_token.expose().as_bytes())
        );
        assert!(stored.expires_at > Utc::now() + chrono::Duration::days(6));
    }

    #[tokio::test]
    async fn test_login_upgrades_hash_after_policy_change() {
        let h = Harness::new();
        let output = RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();
        let before = h.repo.find_by_user_id(&output.user_id).await.unwrap().unwrap();

        let mut stronger = (*h.config).clone();
        stronger.hashing.iterations += 1;
        let stronger = std::sync::Arc::new(stronger);
        assert!(before.password_hash.needs_rehash(&stronger.hashing));

        let login = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), stronger.clone());
        login.execute(login_input("alice", PASSWORD)).await.unwrap();

        let after = h.repo.find_by_user_id(&output.user_id).await.unwrap().unwrap();
        assert_ne!(after.password_hash, before.password_hash);
        assert!(!after.password_hash.needs_rehash(&stronger.hashing));

        // the upgraded hash still verifies, and a wrong password still fails
        login.execute(login_input("alice", PASSWORD)).await.unwrap();
        let err = login.execute(login_input("alice", "wrong")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();
        let login = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone());

        let wrong = login.execute(login_input("alice", "wrong")).await.unwrap_err();
        let unknown = login.execute(login_input("bob", PASSWORD)).await.unwrap_err();
        let unusable = login.execute(login_input("x", PASSWORD)).await.unwrap_err();

        for err in [&wrong, &unknown, &unusable] {
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        assert_eq!(wrong.public_message(), unknown.public_message());
    }

    #[tokio::test]
    async fn test_login_reuses_cached_token() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();
        let login = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone());

        let first = login.execute(login_input("alice", PASSWORD)).await.unwrap();
        let cached = h.cache.get(&keys::token(&first.user_id)).await.unwrap();
        assert_eq!(cached.as_deref(), Some(first.token.as_str()));

        let second = login.execute(login_input("alice", PASSWORD)).await.unwrap();
        assert_eq!(second.token, first.token);
        // every login replaces the refresh token
        assert_ne!(second.refresh_token.expose(), first.refresh_token.expose());
    }

    #[tokio::test]
    async fn test_rotation_rules() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();
        let login = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone());
        let output = login.execute(login_input("alice", PASSWORD)).await.unwrap();
        let manager = RefreshTokenManager::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone());
        let now = Utc::now();
        let presented = || Some(RawRefreshToken::presented(output.refresh_token.expose().to_string()));

        // plenty of life left
        let long = h
            .issuer
            .issue_at(output.user_id, "alice", Duration::from_secs(72 * 3600), now)
            .unwrap();
        let err = manager.rotate(&long.token, presented(), now).await.unwrap_err();
        assert!(matches!(err, AuthError::RenewalNotYetAllowed));

        // inside the window, but no or wrong refresh token
        let err = manager.rotate(&output.token, None, now).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
        let wrong = Some(RawRefreshToken::presented("0".repeat(64)));
        let err = manager.rotate(&output.token, wrong, now).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));

        // inside the window with the right refresh token
        let renewed = manager.rotate(&output.token, presented(), now).await.unwrap();
        assert_ne!(renewed.token, output.token);
        assert!(renewed.claims.remaining(now) > Duration::from_secs(71 * 3600));
        assert_eq!(
            h.cache.get(&keys::token(&output.user_id)).await.unwrap(),
            Some(renewed.token.clone())
        );

        // the renewed token is far from expiry
        let err = manager.rotate(&renewed.token, presented(), now).await.unwrap_err();
        assert!(matches!(err, AuthError::RenewalNotYetAllowed));

        // garbage bearer
        let err = manager.rotate("not.a.jwt", presented(), now).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_rotation_without_refresh_token_when_disabled() {
        let mut config = crate::AuthConfig::testing();
        config.require_refresh_token = false;
        let h = Harness::with(platform::session_cache::MemorySessionCache::new(), config);

        let user_id = crate::domain::value_object::user_id::UserId::new();
        let now = Utc::now();
        let short = h
            .issuer
            .issue_at(user_id, "alice", Duration::from_secs(60), now)
            .unwrap();

        let manager = RefreshTokenManager::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone());
        assert!(manager.rotate(&short.token, None, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_rejected() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();
        let output = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(login_input("alice", PASSWORD))
            .await
            .unwrap();
        let manager = RefreshTokenManager::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone());

        let now = Utc::now();
        assert!(manager.validate(&output.user_id, &output.refresh_token, now).await.is_ok());

        let later = now + chrono::Duration::days(8);
        let err = manager
            .validate(&output.user_id, &output.refresh_token, later)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_logout_revokes_everything() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();
        let output = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(login_input("alice", PASSWORD))
            .await
            .unwrap();
        let authenticator = Authenticator::new(h.issuer.clone(), h.advisory());
        let claims = authenticator.authenticate(&output.token).await.unwrap();

        LogoutUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(&claims, &output.token)
            .await
            .unwrap();

        assert_eq!(h.cache.get(&keys::token(&output.user_id)).await.unwrap(), None);
        let record = h.repo.find_by_user_id(&output.user_id).await.unwrap().unwrap();
        assert!(record.refresh_token.is_none());

        let err = authenticator.authenticate(&output.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_logout_revokes_token_even_if_store_fails() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();
        let output = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(login_input("alice", PASSWORD))
            .await
            .unwrap();
        let authenticator = Authenticator::new(h.issuer.clone(), h.advisory());
        let claims = authenticator.authenticate(&output.token).await.unwrap();

        let stuck = std::sync::Arc::new(StuckRefreshStore(h.repo.clone()));
        let err = LogoutUseCase::new(stuck, h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(&claims, &output.token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Timeout(_)));

        let err = authenticator.authenticate(&output.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));
        assert_eq!(h.cache.get(&keys::token(&output.user_id)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cache_outage_is_not_fatal() {
        let h = Harness::with(FailingSessionCache, crate::AuthConfig::testing());
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("alice", PASSWORD))
            .await
            .unwrap();

        let output = LoginUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(login_input("alice", PASSWORD))
            .await
            .unwrap();

        let claims = Authenticator::new(h.issuer.clone(), h.advisory())
            .authenticate(&output.token)
            .await
            .unwrap();
        LogoutUseCase::new(h.repo.clone(), h.issuer.clone(), h.advisory(), h.config.clone())
            .execute(&claims, &output.token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_username_existence_is_case_insensitive() {
        let h = Harness::new();
        RegisterUseCase::new(h.repo.clone(), h.config.clone())
            .execute(input("bob", PASSWORD))
            .await
            .unwrap();

        let name = UserName::new("BOB").unwrap();
        assert!(h.repo.exists_by_username(&name).await.unwrap());
    }
}

#[cfg(test)]
mod http_tests {
    use axum::http::{StatusCode, header};
    use platform::session_cache::SessionCache;
    use serde_json::json;

    use super::support::*;
    use crate::application::cache::keys;
    use crate::domain::value_object::user_id::UserId;

    #[tokio::test]
    async fn test_register_login_example() {
        let h = Harness::new();
        let app = h.app();
        let creds = json!({"username": "alice", "password": PASSWORD});

        let res = send(&app, json_request("POST", "/register", creds.clone(), None)).await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body, json!({"username": "alice"}));

        let res = send(&app, json_request("POST", "/register", creds.clone(), None)).await;
        assert_eq!(res.status, StatusCode::CONFLICT);

        let res = send(&app, json_request("POST", "/login", creds, None)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(!res.body["token"].as_str().unwrap().is_empty());
        assert!(!res.body["refreshToken"].as_str().unwrap().is_empty());
        assert!(res.body["userid"].as_str().unwrap().parse::<UserId>().is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_share_one_response() {
        let h = Harness::new();
        let app = h.app();
        register_and_login(&app, "alice").await;

        let wrong = send(
            &app,
            json_request("POST", "/login", json!({"username": "alice", "password": "wrong"}), None),
        )
        .await;
        let unknown = send(
            &app,
            json_request("POST", "/login", json!({"username": "bob", "password": PASSWORD}), None),
        )
        .await;

        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.body, unknown.body);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_bad_requests() {
        let h = Harness::new();
        let app = h.app();

        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{\"username\":"))
            .unwrap();
        assert_eq!(send(&app, req).await.status, StatusCode::BAD_REQUEST);

        let res = send(&app, json_request("POST", "/register", json!({"username": "alice"}), None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let res = send(&app, bare_request("POST", "/register", None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_protected_routes_reject_uniformly() {
        let h = Harness::new();
        let app = h.app();

        let missing = send(&app, bare_request("GET", "/profile", None)).await;
        let basic = send(&app, bare_request("GET", "/profile", Some("Basic YWxpY2U6cHc="))).await;
        let lowercase = send(&app, bare_request("GET", "/profile", Some("bearer abc"))).await;
        let garbage = send(&app, bare_request("GET", "/profile", Some("Bearer not.a.jwt"))).await;

        for res in [&missing, &basic, &lowercase, &garbage] {
            assert_eq!(res.status, StatusCode::UNAUTHORIZED);
            assert_eq!(res.body, missing.body);
        }
    }

    #[tokio::test]
    async fn test_refresh_flow() {
        let h = Harness::new();
        let app = h.app();
        let (token, refresh_token, _) = register_and_login(&app, "alice").await;

        // a fresh 15 minute token is already inside the 30 minute window
        let res = send(
            &app,
            json_request("POST", "/token/refresh", json!({"refreshToken": refresh_token}), Some(&token)),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let renewed = res.body["token"].as_str().unwrap().to_string();
        assert_ne!(renewed, token);

        // the renewed token lives 72 hours
        let res = send(
            &app,
            json_request("POST", "/token/refresh", json!({"refreshToken": refresh_token}), Some(&renewed)),
        )
        .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);

        // renewed token authenticates
        let res = send(&app, bare_request("GET", "/profile", Some(&format!("Bearer {renewed}")))).await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token_and_bearer() {
        let h = Harness::new();
        let app = h.app();
        let (token, _, _) = register_and_login(&app, "alice").await;

        let res = send(&app, bare_request("POST", "/token/refresh", Some(&format!("Bearer {token}")))).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let res = send(&app, json_request("POST", "/token/refresh", json!({}), None)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_checks_bearer_before_body() {
        let h = Harness::new();
        let app = h.app();
        let (token, _, _) = register_and_login(&app, "alice").await;

        let broken = |authorization: String| {
            axum::http::Request::builder()
                .method("POST")
                .uri("/token/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, authorization)
                .body(axum::body::Body::from("{oops"))
                .unwrap()
        };

        let res = send(&app, broken("Bearer not.a.jwt".into())).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        // only a caller holding a good token learns the body is malformed
        let res = send(&app, broken(format!("Bearer {token}"))).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_then_token_is_dead() {
        let h = Harness::new();
        let app = h.app();
        let (token, refresh_token, userid) = register_and_login(&app, "alice").await;
        let user_id: UserId = userid.parse().unwrap();
        assert!(h.cache.get(&keys::token(&user_id)).await.unwrap().is_some());

        let res = send(&app, bare_request("POST", "/logout", Some(&format!("Bearer {token}")))).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, json!({"message": "User logged out successfully"}));

        assert_eq!(h.cache.get(&keys::token(&user_id)).await.unwrap(), None);

        let res = send(&app, bare_request("GET", "/profile", Some(&format!("Bearer {token}")))).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let res = send(
            &app,
            json_request("POST", "/token/refresh", json!({"refreshToken": refresh_token}), Some(&token)),
        )
        .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let h = Harness::new();
        let app = h.app();
        let (token, _, userid) = register_and_login(&app, "Alice").await;
        let bearer = format!("Bearer {token}");

        let res = send(&app, bare_request("GET", "/profile", Some(&bearer))).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["userid"], userid.as_str());
        assert_eq!(res.body["username"], "Alice");
        assert!(res.body["email"].is_null());
        assert!(res.body["createdAt"].is_string());

        let res = send(
            &app,
            json_request("PUT", "/profile", json!({"email": "alice@example.com", "bio": "hi"}), Some(&token)),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["email"], "alice@example.com");

        // the cached copy was invalidated, so the public view is fresh
        let res = send(&app, bare_request("GET", "/user/alice", None)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["bio"], "hi");

        let res = send(
            &app,
            json_request("PUT", "/profile", json!({"email": "nope"}), Some(&token)),
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let res = send(&app, bare_request("DELETE", "/profile", Some(&bearer))).await;
        assert_eq!(res.status, StatusCode::OK);

        let res = send(&app, bare_request("GET", "/user/alice", None)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        let res = send(&app, bare_request("GET", "/profile", Some(&bearer))).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert!(h.repo.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_public_profile() {
        let h = Harness::new();
        let app = h.app();

        let res = send(&app, bare_request("GET", "/user/nobody_here", None)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        let res = send(&app, bare_request("GET", "/user/a", None)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limit_on_credential_routes() {
        let mut config = crate::AuthConfig::testing();
        config.rate_limit = platform::rate_limit::RateLimitConfig::new(2, 60);
        let h = Harness::with(platform::session_cache::MemorySessionCache::new(), config);
        let app = h.app();
        let creds = json!({"username": "alice", "password": "wrong"});

        for _ in 0..2 {
            let res = send(&app, json_request("POST", "/login", creds.clone(), None)).await;
            assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        }

        let res = send(&app, json_request("POST", "/login", creds, None)).await;
        assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = res.headers[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        // other clients have their own budget
        let req = {
            let mut req = json_request(
                "POST",
                "/login",
                json!({"username": "alice", "password": "wrong"}),
                None,
            );
            req.headers_mut()
                .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
            req
        };
        assert_eq!(send(&app, req).await.status, StatusCode::UNAUTHORIZED);

        // protected routes are not throttled
        let res = send(&app, bare_request("GET", "/profile", None)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_http_surface_survives_cache_outage() {
        let h = Harness::with(FailingSessionCache, crate::AuthConfig::testing());
        let app = h.app();
        let (token, _, _) = register_and_login(&app, "alice").await;
        let bearer = format!("Bearer {token}");

        let res = send(&app, bare_request("GET", "/profile", Some(&bearer))).await;
        assert_eq!(res.status, StatusCode::OK);
        let res = send(&app, bare_request("GET", "/user/alice", None)).await;
        assert_eq!(res.status, StatusCode::OK);
        let res = send(&app, bare_request("POST", "/logout", Some(&bearer))).await;
        assert_eq!(res.status, StatusCode::OK);
    }
}
