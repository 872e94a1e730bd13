//! Password Hashing and Verification
//!
//! - Argon2id hashing with a configurable cost ([`HashingPolicy`])
//! - NFKC normalisation and a small registration policy
//! - Zeroization of clear text on drop
//!
//! Verification of a malformed stored hash is reported as a mismatch, never
//! as a distinct error, so callers cannot leak which check failed.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Minimum password length in code points
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length in code points
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Hashing Policy
// ============================================================================

/// Argon2id cost parameters used for new hashes.
///
/// Existing hashes carry their own parameters in the PHC string, so changing
/// the policy never breaks verification of stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingPolicy {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingPolicy {
    /// OWASP recommendation: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingPolicy {
    /// Cheapest parameters argon2 accepts. Tests only.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordHashError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// Not `Clone`, and `Debug` output is redacted.
///
/// ```rust
/// use platform::password::{ClearTextPassword, HashingPolicy};
///
/// let password = ClearTextPassword::new("Secr3t!".to_string()).unwrap();
/// let hashed = password.hash(None, &HashingPolicy::minimal()).unwrap();
/// assert!(hashed.verify(&password, None));
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalise (NFKC) and apply the registration policy.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let raw = Zeroizing::new(raw);
        let normalized: String = raw.nfkc().collect();
        let candidate = Self(normalized);

        if candidate.0.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        // code points, not bytes
        let char_count = candidate.0.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if candidate
            .0
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        if is_common_pattern(&candidate.0) {
            return Err(PasswordPolicyError::CommonPattern);
        }

        Ok(candidate)
    }

    /// Normalise without applying the policy.
    ///
    /// Used on the login path: a password that would not pass registration
    /// today must still be comparable, and must fail as a plain mismatch.
    pub fn for_verification(raw: String) -> Self {
        let raw = Zeroizing::new(raw);
        Self(raw.nfkc().collect())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let mut bytes = self.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        Zeroizing::new(bytes)
    }

    /// Hash with Argon2id and a fresh 16-byte salt.
    ///
    /// CPU and memory heavy: call it from a blocking task.
    pub fn hash(
        &self,
        pepper: Option<&[u8]>,
        policy: &HashingPolicy,
    ) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = policy
            .hasher()?
            .hash_password(&self.peppered(pepper), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Argon2id hash in PHC string format (algorithm, version, params, salt, hash).
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Parse a stored PHC string.
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    /// Wrap a stored value without parsing it.
    ///
    /// A corrupt value simply never verifies.
    pub fn from_stored_unchecked(s: impl Into<String>) -> Self {
        Self { hash: s.into() }
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a password against this hash.
    ///
    /// Parameters are read from the PHC string; the comparison inside argon2
    /// is constant time. Any parse failure is a mismatch.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(&password.peppered(pepper), &parsed_hash)
            .is_ok()
    }

    /// True when the stored hash is not Argon2id or uses other parameters
    /// than `policy`.
    pub fn needs_rehash(&self, policy: &HashingPolicy) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return true;
        };
        if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        match Params::try_from(&parsed_hash) {
            Ok(params) => {
                params.m_cost() != policy.memory_kib
                    || params.t_cost() != policy.iterations
                    || params.p_cost() != policy.parallelism
            }
            Err(_) => true,
        }
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn is_common_pattern(password: &str) -> bool {
    let lower = password.to_lowercase();

    // "aaaaaa"
    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &[
        "qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx",
    ];
    if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "password1",
        "password123",
        "abcdef",
        "abcdefgh",
        "letmein",
        "welcome",
        "admin123",
        "iloveyou",
        "sunshine",
        "princess",
        "football",
        "monkey",
        "shadow",
        "master",
        "dragon",
        "baseball",
        "trustno1",
    ];

    COMMON_PASSWORDS.contains(&lower.as_str())
}

/// "123456", "98765": every digit one step from the previous one
fn is_sequential_numbers(s: &str) -> bool {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 4 {
        return false;
    }

    let is_ascending = digits
        .windows(2)
        .all(|w| w[1] == w[0] + 1 || (w[0] == 9 && w[1] == 0));
    let is_descending = digits
        .windows(2)
        .all(|w| w[0] == w[1] + 1 || (w[0] == 0 && w[1] == 9));

    is_ascending || is_descending
}
