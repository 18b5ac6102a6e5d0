//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Customer token signing secret (min 32 chars, high entropy)
//! - `ADMIN_JWT_SECRET` - Admin token signing secret (min 32 chars, high entropy)
//! - `ADMIN_EMAIL` - Back-office login email
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC hash of the back-office password
//!   (generate with `alankree-cli admin hash-password`)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 5000)
//! - `APP_ENV` - `development` or `production` (default: development)
//! - `PUBLIC_BASE_URL` - Public URL of this API (default: `http://localhost:{PORT}`)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins
//!   (default: `http://localhost:3000,http://localhost:3001`)
//! - `UPLOADS_DIR` - Local image directory (default: uploads)
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` -
//!   Image CDN credentials; all three or none
//! - `LOG_FORMAT` - `json` for structured logs (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use alankree_core::Email;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Whether this is a production deployment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Public URL of this API, used to build local image URLs
    pub public_base_url: Url,
    /// Browser origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,
    /// Token and admin credential settings
    pub auth: AuthConfig,
    /// Directory for locally stored product images
    pub uploads_dir: PathBuf,
    /// Image CDN credentials, if configured
    pub cloudinary: Option<CloudinaryConfig>,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Token signing and back-office credential configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct AuthConfig {
    /// Customer token signing secret
    pub jwt_secret: SecretString,
    /// Admin token signing secret
    pub admin_jwt_secret: SecretString,
    /// Back-office login email
    pub admin_email: Email,
    /// Argon2 PHC hash of the back-office password
    pub admin_password_hash: SecretString,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("admin_jwt_secret", &"[REDACTED]")
            .field("admin_email", &self.admin_email)
            .field("admin_password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Cloudinary upload credentials.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = parse_env("HOST", "127.0.0.1")?;
        let port: u16 = parse_env("PORT", "5000")?;
        let environment = parse_env("APP_ENV", "development")?;

        let default_base_url = format!("http://localhost:{port}");
        let public_base_url = Url::parse(&get_env_or_default("PUBLIC_BASE_URL", &default_base_url))
            .map_err(|e| ConfigError::InvalidEnvVar("PUBLIC_BASE_URL".to_string(), e.to_string()))?;

        let cors_allowed_origins = parse_origins(&get_env_or_default(
            "CORS_ALLOWED_ORIGINS",
            "http://localhost:3000,http://localhost:3001",
        ));

        let auth = AuthConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            public_base_url,
            cors_allowed_origins,
            auth,
            uploads_dir: PathBuf::from(get_env_or_default("UPLOADS_DIR", "uploads")),
            cloudinary,
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Public URL for a file stored in the local uploads directory.
    #[must_use]
    pub fn upload_url(&self, filename: &str) -> String {
        let base = self.public_base_url.as_str().trim_end_matches('/');
        format!("{base}/uploads/{filename}")
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;
        let admin_jwt_secret = get_validated_secret("ADMIN_JWT_SECRET")?;
        validate_secret_length(&admin_jwt_secret, "ADMIN_JWT_SECRET")?;

        if jwt_secret.expose_secret() == admin_jwt_secret.expose_secret() {
            return Err(ConfigError::InsecureSecret(
                "ADMIN_JWT_SECRET".to_string(),
                "must differ from JWT_SECRET".to_string(),
            ));
        }

        let admin_email = Email::parse(&get_required_env("ADMIN_EMAIL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_EMAIL".to_string(), e.to_string()))?;

        let admin_password_hash = get_required_env("ADMIN_PASSWORD_HASH")?;
        argon2::PasswordHash::new(&admin_password_hash).map_err(|e| {
            ConfigError::InvalidEnvVar("ADMIN_PASSWORD_HASH".to_string(), e.to_string())
        })?;

        Ok(Self {
            jwt_secret,
            admin_jwt_secret,
            admin_email,
            admin_password_hash: SecretString::from(admin_password_hash),
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cloud_name = get_optional_env("CLOUDINARY_CLOUD_NAME");
        let api_key = get_optional_env("CLOUDINARY_API_KEY");
        let api_secret = get_optional_env("CLOUDINARY_API_SECRET");

        match (cloud_name, api_key, api_secret) {
            (None, None, None) => Ok(None),
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(Some(Self {
                cloud_name,
                api_key,
                api_secret: SecretString::from(api_secret),
            })),
            _ => Err(ConfigError::InvalidEnvVar(
                "CLOUDINARY_*".to_string(),
                "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET must be set together"
                    .to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl ServerConfig {
    /// Configuration for in-process router tests. Never reads the environment.
    pub(crate) fn for_tests() -> Self {
        use argon2::PasswordHasher;
        use argon2::password_hash::SaltString;

        let salt = SaltString::encode_b64(b"alankree-test-salt").unwrap();
        let hash = argon2::Argon2::default()
            .hash_password(b"Sup3r-Adm1n-Pass", &salt)
            .unwrap()
            .to_string();

        Self {
            database_url: SecretString::from("postgres://localhost/alankree_test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            environment: Environment::Development,
            public_base_url: Url::parse("http://localhost:5000").unwrap(),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            auth: AuthConfig {
                jwt_secret: SecretString::from("k3J9xQ2mVt7LpR4wZ8nB1cF6hY0sD5gA"),
                admin_jwt_secret: SecretString::from("Wq8Ez3Rt6Yu1Io4Pa7Sd0Fg2Hj5Kl9Zx"),
                admin_email: Email::parse("admin@alankree.in").unwrap(),
                admin_password_hash: SecretString::from(hash),
            },
            uploads_dir: std::env::temp_dir().join("alankree-test-uploads"),
            cloudinary: None,
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-jwt-secret-here", "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength(&"ab".repeat(20), "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins(" http://localhost:3000/ ,, https://alankree.in ");
        assert_eq!(origins, vec!["http://localhost:3000", "https://alankree.in"]);
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("Production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_upload_url_joins_cleanly() {
        let mut config = ServerConfig::for_tests();
        config.public_base_url = Url::parse("https://api.alankree.in/").unwrap();
        assert_eq!(
            config.upload_url("abc.png"),
            "https://api.alankree.in/uploads/abc.png"
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::for_tests();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn test_auth_config_debug_redacts() {
        let config = ServerConfig::for_tests();
        let debug = format!("{:?}", config.auth);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k3J9xQ2m"));
    }
}
