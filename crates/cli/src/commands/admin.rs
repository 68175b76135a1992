//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account
//! sunleaf-cli admin create -u kavi -e admin@sunleaf.farm -n "Kavi" -p 9876543210
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `ADMIN_PASSWORD` - Password for the new account (never passed as an
//!   argument, so it stays out of shell history and process listings)

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sunleaf_core::{Email, Phone, UserRole};
use thiserror::Error;

/// Shortest admin password accepted, matching the reset flow's floor.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors that can occur during admin account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Invalid phone number.
    #[error("Invalid phone number: {0} (expected 10 digits)")]
    InvalidPhone(String),

    /// Password does not meet the minimum length.
    #[error("ADMIN_PASSWORD must be at least {MIN_PASSWORD_LENGTH} characters long")]
    WeakPassword,

    /// An account already exists with the same username, email, or phone.
    #[error("An account already exists with username, email, or phone matching: {0}")]
    UserExists(String),

    /// Password hashing error.
    #[error("Password hashing error: {0}")]
    Hash(String),
}

/// Create a new admin account.
///
/// # Arguments
///
/// * `username` - Login username
/// * `email` - Email address
/// * `name` - Display name
/// * `phone` - Phone number (10 digits)
///
/// # Returns
///
/// The ID of the created account.
pub async fn create_admin(
    username: &str,
    email: &str,
    name: &str,
    phone: &str,
) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let phone = Phone::parse(phone).map_err(|_| AdminError::InvalidPhone(phone.to_owned()))?;

    let password: SecretString = std::env::var("ADMIN_PASSWORD")
        .map_err(|_| AdminError::MissingEnvVar("ADMIN_PASSWORD"))?
        .into();
    if password.expose_secret().len() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| AdminError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Creating admin account: {} ({})", username, email.masked());

    // Check if an account already exists with the same identity
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2 OR phone = $3)",
    )
    .bind(username)
    .bind(email.as_str())
    .bind(phone.as_str())
    .fetch_one(&pool)
    .await?;

    if exists {
        return Err(AdminError::UserExists(username.to_owned()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| AdminError::Hash(e.to_string()))?
        .to_string();

    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (name, username, email, phone, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(name)
    .bind(username)
    .bind(email.as_str())
    .bind(phone.as_str())
    .bind(&password_hash)
    .bind(UserRole::Admin)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Username: {}, Role: {}",
        user_id,
        username,
        UserRole::Admin
    );

    Ok(user_id)
}
