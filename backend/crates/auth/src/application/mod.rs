//! Application Layer
//!
//! Use cases and application services.

pub mod access_token;
pub mod authenticate;
pub mod cache;
pub mod config;
pub mod login;
pub mod logout;
pub mod profile;
pub mod refresh_tokens;
pub mod register;

// Re-exports
pub use access_token::{AccessClaims, IssuedToken, TokenIssuer};
pub use authenticate::Authenticator;
pub use cache::AdvisoryCache;
pub use config::{AuthConfig, TokenSecret};
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use profile::{ProfileEditInput, ProfileUseCase};
pub use refresh_tokens::RefreshTokenManager;
pub use register::{RegisterInput, RegisterOutput, RegisterUseCase};
