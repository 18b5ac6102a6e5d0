//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] alankree_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A registered account already uses the email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Required registration field left blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Account exists but has been switched off.
    #[error("account is deactivated")]
    AccountDeactivated,

    /// Token is malformed, has a bad signature or wrong issuer/audience.
    #[error("invalid token")]
    InvalidToken,

    /// Token signature is valid but it has expired.
    #[error("token expired")]
    TokenExpired,

    /// Valid admin-signed token that does not name the configured admin.
    #[error("admin privileges required")]
    NotAdmin,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token encoding error: {0}")]
    TokenEncoding(#[source] jsonwebtoken::errors::Error),
}
