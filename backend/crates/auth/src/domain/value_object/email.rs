//! Email Value Object
//!
//! Optional profile contact address. Format check only; nothing here proves
//! the mailbox exists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RFC 5321 path limit
const EMAIL_MAX_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Trim, lower-case and validate.
    pub fn new(email: impl AsRef<str>) -> Result<Self, String> {
        let email = email.as_ref().trim().to_lowercase();

        if email.is_empty() {
            return Err("Email cannot be empty".to_string());
        }
        if email.len() > EMAIL_MAX_LENGTH {
            return Err(format!("Email must be at most {EMAIL_MAX_LENGTH} characters"));
        }
        if !Self::is_valid_format(&email) {
            return Err("Invalid email format".to_string());
        }

        Ok(Self(email))
    }

    fn is_valid_format(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };

        if local.is_empty() || local.len() > 64 || local.chars().any(char::is_whitespace) {
            return false;
        }

        !domain.is_empty()
            && domain.contains('.')
            && domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
            && !domain.starts_with(['.', '-'])
            && !domain.ends_with(['.', '-'])
            && !domain.contains("..")
    }

    /// Stored value, assumed valid
    pub fn from_db(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
