//! Authentication service.
//!
//! Customer accounts use argon2 password hashes stored on the user row. The
//! single back-office account is configured through `ADMIN_EMAIL` and
//! `ADMIN_PASSWORD_HASH` and has no database row.

mod error;
pub mod tokens;

pub use error::AuthError;
pub use tokens::{AdminClaims, TokenService, UserClaims};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{info, warn};

use alankree_core::Email;

use crate::config::AuthConfig;
use crate::db::{RepositoryError, UserRepository};
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Result of a successful login on the customer endpoint.
#[derive(Debug)]
pub enum LoginOutcome {
    /// A customer signed in.
    Customer { user: User, token: String },
    /// The back-office credentials were used.
    Admin { email: Email, token: String },
}

/// Registration form.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub password: &'r str,
    pub phone: Option<&'r str>,
}

/// Authentication service.
///
/// Handles registration, customer login and back-office login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
    config: &'a AuthConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService, config: &'a AuthConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
            config,
        }
    }

    /// Register a customer and issue a token.
    ///
    /// A guest-checkout record for the same email is upgraded in place.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: Registration<'_>) -> Result<(User, String), AuthError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        let email = Email::parse(form.email)?;
        validate_password(form.password)?;
        let password_hash = hash_password(form.password)?;
        let phone = form.phone.map(str::trim).filter(|p| !p.is_empty());

        let user = self
            .users
            .register(name, &email, phone, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let token = self.tokens.issue_user_token(user.id)?;
        info!(user_id = %user.id, "Customer registered");
        Ok((user, token))
    }

    /// Log in on the customer endpoint.
    ///
    /// The back-office credentials are accepted here too and produce an
    /// admin token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// and `AuthError::AccountDeactivated` for switched-off accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        if admin_credentials_match(self.config, &email, password) {
            let token = self.tokens.issue_admin_token()?;
            info!(email = %email, "Admin logged in via customer login");
            return Ok(LoginOutcome::Admin { email, token });
        }

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Guest-checkout records have no password
        let password_hash = password_hash.ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        self.users.record_login(user.id).await?;
        let token = self.tokens.issue_user_token(user.id)?;
        Ok(LoginOutcome::Customer { user, token })
    }

    /// Log in to the back office.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` unless both the email and the
    /// password match the configured admin account.
    pub fn admin_login(&self, email: &str, password: &str) -> Result<(Email, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        if !admin_credentials_match(self.config, &email, password) {
            warn!(email = %email, "Failed admin login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue_admin_token()?;
        info!(email = %email, "Admin logged in");
        Ok((email, token))
    }
}

/// Whether the email and password are the configured back-office account.
#[must_use]
pub fn admin_credentials_match(config: &AuthConfig, email: &Email, password: &str) -> bool {
    email == &config.admin_email
        && verify_password(password, config.admin_password_hash.expose_secret()).is_ok()
}

/// Check a new password against the length rule.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the hash is malformed or the
/// password does not match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
