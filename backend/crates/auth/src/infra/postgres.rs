//! PostgreSQL Repository Implementations

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    credential::{CredentialRecord, StoredRefreshToken},
    profile::{Profile, ProfileUpdate},
};
use crate::domain::repository::{CredentialRepository, ProfileRepository};
use crate::domain::value_object::{
    email::Email, refresh_token::RefreshTokenHash, user_id::UserId, user_name::UserName,
    user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(3);

/// PostgreSQL-backed credential and profile store
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Deadline applied to every statement or transaction
    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    async fn bounded<T, F>(&self, fut: F) -> AuthResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Timeout("credential store")),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for PgAuthRepository {
    async fn create(&self, record: &CredentialRecord) -> AuthResult<()> {
        let result = self
            .bounded(async {
                let mut tx = self.pool.begin().await?;

                sqlx::query(
                    r#"
                    INSERT INTO credentials (
                        user_id,
                        username,
                        username_canonical,
                        password_hash,
                        created_at,
                        updated_at
                    ) VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(record.user_id.as_uuid())
                .bind(record.username.original())
                .bind(record.username.canonical())
                .bind(record.password_hash.as_phc_string())
                .bind(record.created_at)
                .bind(record.updated_at)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO user_profiles (user_id, created_at, updated_at)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(record.user_id.as_uuid())
                .bind(record.created_at)
                .bind(record.updated_at)
                .execute(&mut *tx)
                .await?;

                tx.commit().await
            })
            .await;

        match result {
            Err(AuthError::Database(e)) if is_unique_violation(&e) => Err(AuthError::UsernameTaken),
            other => other,
        }
    }

    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<CredentialRecord>> {
        let row = self
            .bounded(
                sqlx::query_as::<_, CredentialRow>(
                    r#"
                    SELECT
                        user_id,
                        username,
                        password_hash,
                        refresh_token_hash,
                        refresh_token_expires_at,
                        created_at,
                        updated_at
                    FROM credentials
                    WHERE username_canonical = $1
                    "#,
                )
                .bind(username.canonical())
                .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.map(CredentialRow::into_record))
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> AuthResult<Option<CredentialRecord>> {
        let row = self
            .bounded(
                sqlx::query_as::<_, CredentialRow>(
                    r#"
                    SELECT
                        user_id,
                        username,
                        password_hash,
                        refresh_token_hash,
                        refresh_token_expires_at,
                        created_at,
                        updated_at
                    FROM credentials
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.map(CredentialRow::into_record))
    }

    async fn exists_by_username(&self, username: &UserName) -> AuthResult<bool> {
        self.bounded(
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM credentials WHERE username_canonical = $1)",
            )
            .bind(username.canonical())
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn store_refresh_token(
        &self,
        user_id: &UserId,
        token: &StoredRefreshToken,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        let updated = self
            .bounded(
                sqlx::query(
                    r#"
                    UPDATE credentials SET
                        refresh_token_hash = $2,
                        refresh_token_expires_at = $3,
                        updated_at = $4
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id.as_uuid())
                .bind(token.hash.as_str())
                .bind(token.expires_at)
                .bind(now)
                .execute(&self.pool),
            )
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn clear_refresh_token(&self, user_id: &UserId, now: DateTime<Utc>) -> AuthResult<()> {
        self.bounded(
            sqlx::query(
                r#"
                UPDATE credentials SET
                    refresh_token_hash = NULL,
                    refresh_token_expires_at = NULL,
                    updated_at = $2
                WHERE user_id = $1
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(now)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: &UserId,
        password_hash: &UserPassword,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        self.bounded(
            sqlx::query(
                r#"
                UPDATE credentials SET
                    password_hash = $2,
                    updated_at = $3
                WHERE user_id = $1
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(password_hash.as_phc_string())
            .bind(now)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> AuthResult<bool> {
        let deleted = self
            .bounded(
                sqlx::query("DELETE FROM credentials WHERE user_id = $1")
                    .bind(user_id.as_uuid())
                    .execute(&self.pool),
            )
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// Profile Repository Implementation
// ============================================================================

impl ProfileRepository for PgAuthRepository {
    async fn find_profile(&self, user_id: &UserId) -> AuthResult<Option<Profile>> {
        let row = self
            .bounded(
                sqlx::query_as::<_, ProfileRow>(
                    r#"
                    SELECT
                        p.user_id,
                        c.username,
                        p.email,
                        p.bio,
                        p.created_at,
                        p.updated_at
                    FROM user_profiles p
                    JOIN credentials c ON c.user_id = p.user_id
                    WHERE p.user_id = $1
                    "#,
                )
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.map(ProfileRow::into_profile))
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> AuthResult<Option<Profile>> {
        let row = self
            .bounded(
                sqlx::query_as::<_, ProfileRow>(
                    r#"
                    WITH updated AS (
                        UPDATE user_profiles SET
                            email = COALESCE($2, email),
                            bio = COALESCE($3, bio),
                            updated_at = $4
                        WHERE user_id = $1
                        RETURNING user_id, email, bio, created_at, updated_at
                    )
                    SELECT
                        u.user_id,
                        c.username,
                        u.email,
                        u.bio,
                        u.created_at,
                        u.updated_at
                    FROM updated u
                    JOIN credentials c ON c.user_id = u.user_id
                    "#,
                )
                .bind(user_id.as_uuid())
                .bind(update.email.as_ref().map(Email::as_str))
                .bind(update.bio.as_deref())
                .bind(Utc::now())
                .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.map(ProfileRow::into_profile))
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    username: String,
    password_hash: String,
    refresh_token_hash: Option<String>,
    refresh_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_record(self) -> CredentialRecord {
        let refresh_token = match (self.refresh_token_hash, self.refresh_token_expires_at) {
            (Some(hash), Some(expires_at)) => Some(StoredRefreshToken {
                hash: RefreshTokenHash::from_db(hash),
                expires_at,
            }),
            _ => None,
        };

        CredentialRecord {
            user_id: UserId::from_uuid(self.user_id),
            username: UserName::from_db(&self.username),
            password_hash: UserPassword::from_db(self.password_hash),
            refresh_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    username: String,
    email: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self) -> Profile {
        Profile {
            user_id: UserId::from_uuid(self.user_id),
            username: UserName::from_db(&self.username),
            email: self.email.map(Email::from_db),
            bio: self.bio,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
