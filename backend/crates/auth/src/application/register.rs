//! Register Use Case
//!
//! Creates a credential record and an empty profile.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::credential::CredentialRecord;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{
    user_id::UserId,
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct RegisterInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct RegisterOutput {
    pub user_id: UserId,
    /// As the user typed it
    pub username: String,
}

pub struct RegisterUseCase<R>
where
    R: CredentialRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> RegisterUseCase<R>
where
    R: CredentialRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: RegisterInput) -> AuthResult<RegisterOutput> {
        let username =
            UserName::new(&input.username).map_err(|e| AuthError::InvalidInput(e.to_string()))?;
        let password = RawPassword::new(input.password)?;

        // Cheap early exit; `create` is what actually guarantees uniqueness
        if self.repo.exists_by_username(&username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(password, &self.config).await?;
        let record = CredentialRecord::new(username, password_hash);

        self.repo.create(&record).await?;

        tracing::info!(
            user_id = %record.user_id,
            username = %record.username,
            "User registered"
        );

        Ok(RegisterOutput {
            user_id: record.user_id,
            username: record.username.original().to_string(),
        })
    }
}

/// Argon2id on the blocking pool
pub(crate) async fn hash_password(
    password: RawPassword,
    config: &AuthConfig,
) -> AuthResult<UserPassword> {
    let pepper = config.password_pepper.clone();
    let policy = config.hashing;

    tokio::task::spawn_blocking(move || UserPassword::from_raw(&password, pepper.as_deref(), &policy))
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
}
