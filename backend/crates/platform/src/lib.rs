//! Platform Crate - Technical Infrastructure
//!
//! Building blocks with no business rules in them:
//! - Cryptographic utilities (CSPRNG bytes, SHA-256, constant-time equality)
//! - Password hashing (Argon2id) with zeroized clear text
//! - `Authorization: Bearer` extraction and client IP resolution
//! - Fixed-window rate limiting
//! - Session cache abstraction with Redis and in-memory backends

pub mod bearer;
pub mod client;
pub mod crypto;
pub mod password;
pub mod rate_limit;
pub mod session_cache;
