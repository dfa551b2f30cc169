//! Authentication module for imagestore

pub mod authorize;
pub mod jwt;
pub mod middleware;
#[cfg(test)]
mod middleware_tests;
pub mod password;
pub mod reset;

pub use authorize::{authorize, ROLE_ADMIN, ROLE_USER};
pub use jwt::{SessionClaims, SessionTokenIssuer, TokenError};
pub use middleware::{require_auth, AuthError, AuthState, AuthUser, TOKEN_COOKIE};
pub use password::{hash_password, verify_password, PasswordError};
pub use reset::{ResetError, ResetTokenManager};
