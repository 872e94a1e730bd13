//! In-Memory Repository
//!
//! Same contract as [`PgAuthRepository`](super::PgAuthRepository), including
//! atomic username uniqueness. Used by tests and by local runs without a
//! database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    credential::{CredentialRecord, StoredRefreshToken},
    profile::{Profile, ProfileUpdate},
};
use crate::domain::repository::{CredentialRepository, ProfileRepository};
use crate::domain::value_object::{
    user_id::UserId, user_name::UserName, user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct Tables {
    credentials: HashMap<UserId, CredentialRecord>,
    /// canonical username -> user id
    usernames: HashMap<String, UserId>,
    profiles: HashMap<UserId, Profile>,
}

#[derive(Default)]
pub struct MemoryAuthRepository {
    tables: Mutex<Tables>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AuthResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AuthError::Internal("credential table lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.tables.lock().map(|t| t.credentials.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialRepository for MemoryAuthRepository {
    async fn create(&self, record: &CredentialRecord) -> AuthResult<()> {
        let mut tables = self.lock()?;
        let canonical = record.username.canonical().to_string();

        if tables.usernames.contains_key(&canonical) {
            return Err(AuthError::UsernameTaken);
        }

        tables.usernames.insert(canonical, record.user_id);
        tables.credentials.insert(record.user_id, record.clone());
        tables.profiles.insert(
            record.user_id,
            Profile::new(record.user_id, record.username.clone(), record.created_at),
        );
        Ok(())
    }

    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<CredentialRecord>> {
        let tables = self.lock()?;
        Ok(tables
            .usernames
            .get(username.canonical())
            .and_then(|id| tables.credentials.get(id))
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> AuthResult<Option<CredentialRecord>> {
        Ok(self.lock()?.credentials.get(user_id).cloned())
    }

    async fn exists_by_username(&self, username: &UserName) -> AuthResult<bool> {
        Ok(self.lock()?.usernames.contains_key(username.canonical()))
    }

    async fn store_refresh_token(
        &self,
        user_id: &UserId,
        token: &StoredRefreshToken,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut tables = self.lock()?;
        let record = tables
            .credentials
            .get_mut(user_id)
            .ok_or(AuthError::UserNotFound)?;
        record.refresh_token = Some(token.clone());
        record.updated_at = now;
        Ok(())
    }

    async fn clear_refresh_token(&self, user_id: &UserId, now: DateTime<Utc>) -> AuthResult<()> {
        if let Some(record) = self.lock()?.credentials.get_mut(user_id) {
            record.refresh_token = None;
            record.updated_at = now;
        }
        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: &UserId,
        password_hash: &UserPassword,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        if let Some(record) = self.lock()?.credentials.get_mut(user_id) {
            record.password_hash = password_hash.clone();
            record.updated_at = now;
        }
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> AuthResult<bool> {
        let mut tables = self.lock()?;
        let Some(record) = tables.credentials.remove(user_id) else {
            return Ok(false);
        };
        tables.usernames.remove(record.username.canonical());
        tables.profiles.remove(user_id);
        Ok(true)
    }
}

impl ProfileRepository for MemoryAuthRepository {
    async fn find_profile(&self, user_id: &UserId) -> AuthResult<Option<Profile>> {
        Ok(self.lock()?.profiles.get(user_id).cloned())
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> AuthResult<Option<Profile>> {
        let mut tables = self.lock()?;
        Ok(tables.profiles.get_mut(user_id).map(|profile| {
            profile.apply(update);
            profile.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::user_password::UserPassword;

    fn record(name: &str) -> CredentialRecord {
        CredentialRecord::new(
            UserName::new(name).unwrap(),
            UserPassword::from_db("$argon2id$placeholder"),
        )
    }

    #[tokio::test]
    async fn test_uniqueness_is_on_canonical_form() {
        let repo = MemoryAuthRepository::new();
        repo.create(&record("Alice")).await.unwrap();

        let err = repo.create(&record("alice")).await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_profile_and_index() {
        let repo = MemoryAuthRepository::new();
        let rec = record("bob");
        repo.create(&rec).await.unwrap();
        assert!(repo.find_profile(&rec.user_id).await.unwrap().is_some());

        assert!(repo.delete(&rec.user_id).await.unwrap());
        assert!(repo.find_profile(&rec.user_id).await.unwrap().is_none());
        assert!(!repo.exists_by_username(&rec.username).await.unwrap());
        assert!(!repo.delete(&rec.user_id).await.unwrap());
    }
}
