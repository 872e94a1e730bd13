//! Profile Entity
//!
//! Public-facing account data. Created empty at registration alongside the
//! credential record and removed with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::{email::Email, user_id::UserId, user_name::UserName};

/// Serializable so it can be parked in the session cache as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub username: UserName,
    pub email: Option<Email>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: UserId, username: UserName, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username,
            email: None,
            bio: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Apply a partial update. Absent fields stay untouched.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        self.updated_at = Utc::now();
    }
}

/// Validated partial profile edit
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<Email>,
    pub bio: Option<String>,
}
