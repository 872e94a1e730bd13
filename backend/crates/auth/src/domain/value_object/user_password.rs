//! User Password Value Objects
//!
//! Domain wrappers over `platform::password`. [`RawPassword`] is what came
//! in over the wire; [`UserPassword`] is the Argon2id PHC string the
//! credential record keeps.

use platform::password::{ClearTextPassword, HashedPassword, HashingPolicy, PasswordPolicyError};
use std::fmt;

use crate::error::{AuthError, AuthResult};

/// Password from user input. Zeroized on drop.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Registration path: the password policy applies and violations are 400.
    pub fn new(raw: String) -> AuthResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|e| AuthError::InvalidInput(policy_message(&e)))
    }

    /// Login path: no policy, so nothing here can fail differently from a
    /// plain mismatch.
    pub fn for_login(raw: String) -> Self {
        Self(ClearTextPassword::for_verification(raw))
    }
}

fn policy_message(err: &PasswordPolicyError) -> String {
    match err {
        PasswordPolicyError::EmptyOrWhitespace => "Password cannot be empty".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

/// Hashed password as stored
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    /// Argon2id hash of `raw`. Blocking; run it off the async executor.
    pub fn from_raw(
        raw: &RawPassword,
        pepper: Option<&[u8]>,
        policy: &HashingPolicy,
    ) -> AuthResult<Self> {
        raw.0
            .hash(pepper, policy)
            .map(Self)
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Wrap a stored PHC string. A corrupt value is kept as-is and will
    /// simply never verify.
    pub fn from_db(phc_string: impl Into<String>) -> Self {
        Self(HashedPassword::from_stored_unchecked(phc_string))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Blocking, constant time. Any failure, including a malformed stored
    /// hash, is `false`.
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }

    /// Hashed with other parameters than `policy` asks for
    pub fn needs_rehash(&self, policy: &HashingPolicy) -> bool {
        self.0.needs_rehash(policy)
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}
