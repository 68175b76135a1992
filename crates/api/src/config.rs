//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3001)
//! - `ENVIRONMENT` - Deployment environment name (default: development)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SMTP_HOST` - SMTP relay host for outbound mail
//! - `SMTP_PORT` - SMTP relay port (default: 587)
//! - `SMTP_USERNAME` - SMTP relay username
//! - `SMTP_PASSWORD` - SMTP relay password
//! - `SMTP_FROM` - From address for outbound mail
//!
//! The SMTP variables are all-or-nothing: when none are set the server logs
//! recovery codes instead of emailing them, which is intended for local
//! development only.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a secret as an unfilled template value. Matched
/// case-insensitively; a JWT secret containing any of these is refused at
/// startup rather than silently signing tokens with it.
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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment name (development, staging, production)
    pub environment: String,
    /// Token signing secret for sessions and reset tokens
    pub jwt_secret: SecretString,
    /// SMTP relay configuration; `None` falls back to console delivery
    pub smtp: Option<SmtpConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// SMTP relay configuration for outbound mail.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP relay hostname
    pub host: String,
    /// SMTP relay port (STARTTLS)
    pub port: u16,
    /// Relay username
    pub username: String,
    /// Relay password
    pub password: SecretString,
    /// From address for outbound mail
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ApiConfig {
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

        let database_url = SecretString::from(required_env("DATABASE_URL")?);
        let host = parse_env_or("HOST", "127.0.0.1")?;
        let port = parse_env_or("PORT", "3001")?;
        let environment = env_or("ENVIRONMENT", "development");

        let jwt_secret = required_env("JWT_SECRET")?;
        validate_signing_secret(&jwt_secret, "JWT_SECRET")?;
        let jwt_secret = SecretString::from(jwt_secret);

        let smtp = SmtpConfig::from_env()?;
        let sentry_dsn = std::env::var("SENTRY_DSN").ok();

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            jwt_secret,
            smtp,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SmtpConfig {
    /// Load the SMTP block, requiring either all variables or none.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = std::env::var("SMTP_HOST").ok();
        let username = std::env::var("SMTP_USERNAME").ok();
        let password = std::env::var("SMTP_PASSWORD").ok();
        let from_address = std::env::var("SMTP_FROM").ok();

        match (host, username, password, from_address) {
            (Some(host), Some(username), Some(password), Some(from_address)) => {
                let port = parse_env_or("SMTP_PORT", "587")?;
                Ok(Some(Self {
                    host,
                    port,
                    username,
                    password: SecretString::from(password),
                    from_address,
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::MissingEnvVar(
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD, and SMTP_FROM must all be set to enable SMTP".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable with a default and parse it.
fn parse_env_or<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Reject signing secrets that are short, look like template placeholders,
/// or carry too little entropy to have been randomly generated.
fn validate_signing_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_JWT_SECRET_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
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

/// Shannon entropy of the character distribution, in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut freq: HashMap<char, f64> = HashMap::new();
    let mut len = 0.0f64;
    for c in s.chars() {
        *freq.entry(c).or_insert(0.0) += 1.0;
        len += 1.0;
    }
    if len == 0.0 {
        return 0.0;
    }
    freq.values()
        .map(|count| {
            let p = count / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entropy_of_empty_string_is_zero() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_of_repeated_char_is_zero() {
        assert!(shannon_entropy("aaaaaaa").abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_of_even_two_char_split_is_one_bit() {
        assert!((shannon_entropy("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn entropy_of_random_looking_string_is_high() {
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn placeholder_secrets_are_rejected() {
        for secret in [
            "your-api-key-here-your-api-key-here",
            "changeme123-changeme123-changeme123",
        ] {
            let err = validate_signing_secret(secret, "TEST_VAR").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        }
    }

    #[test]
    fn short_secrets_are_rejected() {
        let err = validate_signing_secret("short", "TEST_JWT").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn low_entropy_secrets_are_rejected() {
        let err =
            validate_signing_secret(&"ab".repeat(20), "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn strong_secrets_are_accepted() {
        assert!(validate_signing_secret("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6j", "TEST_VAR").is_ok());
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            environment: "development".to_string(),
            jwt_secret: SecretString::from("x".repeat(32)),
            smtp: None,
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn smtp_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: SecretString::from("super_secret_smtp_password"),
            from_address: "Sunleaf <no-reply@sunleaf.example>".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("mailer"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
