//! Authentication
//!
//! Validates bearer tokens and resolves the calling actor. Tokens are issued
//! elsewhere; this service only verifies them.

mod error;
pub mod jwt;
mod middleware;

pub use error::{AuthError, AuthResult, ErrorResponse};
pub use middleware::{require_auth, AuthUser};
