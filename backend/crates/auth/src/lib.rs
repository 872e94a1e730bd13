//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token issuer, refresh-token manager
//! - `infra/` - PostgreSQL and in-memory repository implementations
//! - `presentation/` - HTTP handlers, DTOs, extractors, middleware, router
//!
//! ## Features
//! - Registration and login with username + password
//! - Stateless HS256 access tokens (15 min, 72 h after renewal)
//! - Opaque refresh tokens, stored only as SHA-256 digests
//! - Renewal window: an access token can be renewed in its last 30 minutes
//! - Logout revokes the refresh token and denylists the access token
//! - Profile read/update/delete with an advisory session cache
//!
//! ## Security Model
//! - Passwords hashed with Argon2id off the async executor
//! - One generic 401 for unknown user and wrong password, with equal work
//! - One generic 401 body for every token failure
//! - Per-IP rate limiting on the credential endpoints

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::{AuthConfig, TokenSecret};
pub use error::{AuthError, AuthResult};
pub use infra::{memory::MemoryAuthRepository, postgres::PgAuthRepository};
pub use presentation::router::{auth_router, auth_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
