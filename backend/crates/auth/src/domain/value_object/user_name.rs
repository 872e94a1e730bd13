//! Username Value Object
//!
//! The public handle a person registers and logs in with.
//!
//! - ASCII only (`a-z`, `0-9`, `_ . - +`)
//! - Upper case input is accepted; uniqueness is decided on the lower-case
//!   canonical form
//! - Processing order: NFKC → trim → validate → lower-case
//!
//! ## Invariants
//! - 3..=30 characters after normalisation
//! - starts and ends with a letter, digit or `_`
//! - no `..`, no whitespace, at least one letter or digit
//! - not a reserved word

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 30;

const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-', '+'];

/// Names that collide with routes, roles or system accounts
const RESERVED_WORDS: &[&str] = &[
    // system
    "admin", "administrator", "root", "system", "superuser", "moderator", "staff", "support",
    // routes
    "api", "auth", "login", "logout", "register", "token", "refresh", "profile", "user", "users",
    // placeholders
    "null", "undefined", "anonymous", "guest", "me", "self", "test", "official", "bot",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    Empty,
    TooShort { length: usize, min: usize },
    TooLong { length: usize, max: usize },
    InvalidCharacter { char: char, position: usize },
    InvalidStart { char: char },
    InvalidEnd { char: char },
    ConsecutiveDots,
    NoAlphanumeric,
    ContainsWhitespace,
    Reserved { word: String },
}

impl fmt::Display for UsernameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Username cannot be empty"),
            Self::TooShort { length, min } => {
                write!(f, "Username is too short ({length} chars, minimum {min})")
            }
            Self::TooLong { length, max } => {
                write!(f, "Username is too long ({length} chars, maximum {max})")
            }
            Self::InvalidCharacter { char, position } => write!(
                f,
                "Invalid character '{char}' at position {position}. Only a-z, 0-9, _, ., -, + are allowed"
            ),
            Self::InvalidStart { char } => write!(
                f,
                "Username cannot start with '{char}'. Must start with a-z, 0-9, or _"
            ),
            Self::InvalidEnd { char } => write!(
                f,
                "Username cannot end with '{char}'. Must end with a-z, 0-9, or _"
            ),
            Self::ConsecutiveDots => write!(f, "Username cannot contain consecutive dots (..)"),
            Self::NoAlphanumeric => write!(f, "Username must contain at least one letter or digit"),
            Self::ContainsWhitespace => write!(f, "Username cannot contain whitespace"),
            Self::Reserved { word } => write!(f, "'{word}' is a reserved username"),
        }
    }
}

impl std::error::Error for UsernameError {}

/// Validated, normalised username.
///
/// `original` is what the user typed (NFKC, trimmed, case kept) and is what
/// gets echoed back; `canonical` is the lower-case key the store keeps unique.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName {
    original: String,
    canonical: String,
}

impl UserName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, UsernameError> {
        let original: String = input.as_ref().nfkc().collect::<String>().trim().to_string();
        let canonical = original.to_lowercase();
        Self::validate(&canonical)?;
        Ok(Self {
            original,
            canonical,
        })
    }

    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    #[inline]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Rebuild from a stored value without re-validating.
    ///
    /// Rows written under an older rule set must stay loadable.
    pub fn from_db(original: &str) -> Self {
        Self {
            original: original.to_string(),
            canonical: original.to_lowercase(),
        }
    }

    fn validate(canonical: &str) -> Result<(), UsernameError> {
        let (Some(first), Some(last)) = (canonical.chars().next(), canonical.chars().next_back())
        else {
            return Err(UsernameError::Empty);
        };

        let length = canonical.chars().count();
        if length < USERNAME_MIN_LENGTH {
            return Err(UsernameError::TooShort {
                length,
                min: USERNAME_MIN_LENGTH,
            });
        }
        if length > USERNAME_MAX_LENGTH {
            return Err(UsernameError::TooLong {
                length,
                max: USERNAME_MAX_LENGTH,
            });
        }

        if canonical.chars().any(char::is_whitespace) {
            return Err(UsernameError::ContainsWhitespace);
        }

        if let Some((position, char)) = canonical
            .chars()
            .enumerate()
            .find(|&(_, c)| !Self::is_valid_char(c))
        {
            return Err(UsernameError::InvalidCharacter { char, position });
        }

        if !Self::is_valid_edge_char(first) {
            return Err(UsernameError::InvalidStart { char: first });
        }
        if !Self::is_valid_edge_char(last) {
            return Err(UsernameError::InvalidEnd { char: last });
        }

        if canonical.contains("..") {
            return Err(UsernameError::ConsecutiveDots);
        }

        if !canonical.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(UsernameError::NoAlphanumeric);
        }

        if RESERVED_WORDS.contains(&canonical) {
            return Err(UsernameError::Reserved {
                word: canonical.to_string(),
            });
        }

        Ok(())
    }

    #[inline]
    fn is_valid_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || ALLOWED_SPECIAL_CHARS.contains(&c)
    }

    #[inline]
    fn is_valid_edge_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
    }
}

impl fmt::Debug for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserName")
            .field("original", &self.original)
            .field("canonical", &self.canonical)
            .finish()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl TryFrom<String> for UserName {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserName> for String {
    fn from(name: UserName) -> Self {
        name.original
    }
}
