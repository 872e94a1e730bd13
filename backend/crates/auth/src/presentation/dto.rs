//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::profile::Profile;

// ============================================================================
// Register
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    /// Original spelling as submitted
    pub username: String,
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub userid: String,
}

// ============================================================================
// Token Refresh
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub userid: String,
    pub username: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            userid: profile.user_id.to_string(),
            username: profile.username.original().to_string(),
            email: profile.email.map(|e| e.as_str().to_string()),
            bio: profile.bio,
            created_at: profile.created_at,
        }
    }
}

// ============================================================================
// Generic
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
