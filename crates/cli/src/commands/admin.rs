//! Back-office account tools.
//!
//! The back office has a single account configured through
//! `ADMIN_EMAIL` and `ADMIN_PASSWORD_HASH`; there is no admin table.

use alankree_server::services::auth::{self, AuthError};

/// Print an argon2 PHC hash suitable for `ADMIN_PASSWORD_HASH`.
///
/// # Errors
///
/// Returns an error if the password is too short or hashing fails.
#[allow(clippy::print_stdout)]
pub fn hash_password(password: &str) -> Result<(), AuthError> {
    auth::validate_password(password)?;
    let hash = auth::hash_password(password)?;

    tracing::info!("Password hashed. Set it in the server environment:");
    println!("ADMIN_PASSWORD_HASH='{hash}'");
    Ok(())
}
