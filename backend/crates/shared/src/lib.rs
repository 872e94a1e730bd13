//! Shared Kernel
//!
//! The vocabulary every backend crate agrees on:
//! - the [`ErrorKind`](error::kind::ErrorKind) taxonomy and the [`AppError`](error::app_error::AppError)
//!   carrier that renders as an RFC 7807 problem document
//! - typed identifiers ([`Id<T>`](id::Id))
//!
//! Nothing in here knows about authentication, storage or caching.

pub mod error {
    pub mod app_error;
    #[cfg(feature = "axum")]
    pub mod http;
    pub mod kind;
}
pub mod id;
