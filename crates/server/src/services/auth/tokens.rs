//! JWT issuing and verification.
//!
//! Customer and back-office tokens are signed with different secrets, so a
//! customer token can never pass admin verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use alankree_core::{Email, UserId};

use super::AuthError;
use crate::config::AuthConfig;

/// Issuer of back-office tokens.
pub const ADMIN_ISSUER: &str = "alankree-admin";
/// Audience of back-office tokens.
pub const ADMIN_AUDIENCE: &str = "alankree-system";

const USER_TOKEN_DAYS: i64 = 30;
const ADMIN_TOKEN_HOURS: i64 = 24;

/// Claims of a customer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// User id.
    pub sub: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a back-office token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub is_admin: bool,
    pub role: String,
    pub login_time: DateTime<Utc>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies customer and back-office tokens.
#[derive(Clone)]
pub struct TokenService {
    user_encoding: EncodingKey,
    user_decoding: DecodingKey,
    admin_encoding: EncodingKey,
    admin_decoding: DecodingKey,
    admin_email: Email,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the signing keys from configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let user_secret = config.jwt_secret.expose_secret().as_bytes();
        let admin_secret = config.admin_jwt_secret.expose_secret().as_bytes();
        Self {
            user_encoding: EncodingKey::from_secret(user_secret),
            user_decoding: DecodingKey::from_secret(user_secret),
            admin_encoding: EncodingKey::from_secret(admin_secret),
            admin_decoding: DecodingKey::from_secret(admin_secret),
            admin_email: config.admin_email.clone(),
        }
    }

    /// Issue a 30-day customer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue_user_token(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = UserClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(USER_TOKEN_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.user_encoding).map_err(AuthError::TokenEncoding)
    }

    /// Verify a customer token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for expired tokens and
    /// `AuthError::InvalidToken` for anything else that fails verification.
    pub fn verify_user_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<UserClaims>(token, &self.user_decoding, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }

    /// Issue a 24-hour back-office token for the configured admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue_admin_token(&self) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: self.admin_email.to_string(),
            email: self.admin_email.to_string(),
            is_admin: true,
            role: "admin".to_string(),
            login_time: now,
            iss: ADMIN_ISSUER.to_string(),
            aud: ADMIN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(ADMIN_TOKEN_HOURS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.admin_encoding)
            .map_err(AuthError::TokenEncoding)
    }

    /// Verify a back-office token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` or `AuthError::InvalidToken` when
    /// verification fails, and `AuthError::NotAdmin` when the token does not
    /// name the configured admin.
    pub fn verify_admin_token(&self, token: &str) -> Result<AdminClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ADMIN_ISSUER]);
        validation.set_audience(&[ADMIN_AUDIENCE]);

        let claims = decode::<AdminClaims>(token, &self.admin_decoding, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)?;

        if !claims.is_admin || claims.email != self.admin_email.as_str() {
            return Err(AuthError::NotAdmin);
        }
        Ok(claims)
    }

    /// The configured back-office email.
    #[must_use]
    pub const fn admin_email(&self) -> &Email {
        &self.admin_email
    }

    #[cfg(test)]
    fn sign_admin_claims(&self, claims: &AdminClaims) -> String {
        encode(&Header::default(), claims, &self.admin_encoding).unwrap_or_default()
    }

    #[cfg(test)]
    fn sign_user_claims(&self, claims: &UserClaims) -> String {
        encode(&Header::default(), claims, &self.user_encoding).unwrap_or_default()
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn service() -> TokenService {
        TokenService::new(&ServerConfig::for_tests().auth)
    }

    #[test]
    fn test_user_token_roundtrip() {
        let tokens = service();
        let token = tokens.issue_user_token(UserId::new(7)).unwrap();
        let claims = tokens.verify_user_token(&token).unwrap();
        assert_eq!(claims.sub, UserId::new(7));
        assert_eq!(claims.exp - claims.iat, USER_TOKEN_DAYS * 24 * 3600);
    }

    #[test]
    fn test_admin_token_carries_admin_claims() {
        let tokens = service();
        let token = tokens.issue_admin_token().unwrap();
        let claims = tokens.verify_admin_token(&token).unwrap();
        assert!(claims.is_admin);
        assert_eq!(claims.email, "admin@alankree.in");
        assert_eq!(claims.iss, ADMIN_ISSUER);
        assert_eq!(claims.aud, ADMIN_AUDIENCE);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let tokens = service();
        let user_token = tokens.issue_user_token(UserId::new(1)).unwrap();
        let admin_token = tokens.issue_admin_token().unwrap();

        assert!(matches!(
            tokens.verify_admin_token(&user_token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            tokens.verify_user_token(&admin_token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let tokens = service();
        let issued = Utc::now() - Duration::days(31);
        let token = tokens.sign_user_claims(&UserClaims {
            sub: UserId::new(1),
            iat: issued.timestamp(),
            exp: (issued + Duration::days(30)).timestamp(),
        });
        assert!(matches!(
            tokens.verify_user_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            service().verify_user_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_admin_token_for_other_email_is_rejected() {
        let tokens = service();
        let now = Utc::now();
        let token = tokens.sign_admin_claims(&AdminClaims {
            sub: "someone@alankree.in".to_string(),
            email: "someone@alankree.in".to_string(),
            is_admin: true,
            role: "admin".to_string(),
            login_time: now,
            iss: ADMIN_ISSUER.to_string(),
            aud: ADMIN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        });
        assert!(matches!(
            tokens.verify_admin_token(&token),
            Err(AuthError::NotAdmin)
        ));
    }
}
