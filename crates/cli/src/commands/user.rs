//! Customer account tools.

use thiserror::Error;

use alankree_core::Email;
use alankree_server::db::{RepositoryError, UserRepository};
use alankree_server::services::auth::{self, AuthError};

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No user with email: {0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// Replace a customer's password.
///
/// Guest records become registered accounts.
pub async fn set_password(email: &str, password: &str) -> Result<(), UserError> {
    let email = Email::parse(email).map_err(|_| UserError::InvalidEmail(email.to_owned()))?;
    auth::validate_password(password)?;
    let hash = auth::hash_password(password)?;

    let pool = connect().await?;
    UserRepository::new(&pool)
        .set_password(&email, &hash)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound(email.to_string()),
            other => UserError::Repository(other),
        })?;

    tracing::info!(email = %email, "Password updated");
    Ok(())
}
