//! Credential and recovery flows: registration, login, and the three-step
//! password reset (request code, verify code, reset).

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;

use sunleaf_core::{Email, Phone, UserRole};

use crate::db::users::NewUser;
use crate::db::{OneTimeCodeRepository, RepositoryError, UserRepository};
use crate::error::AppError;
use crate::models::User;
use crate::services::notify::{Notifier, generate_one_time_code};
use crate::tokens::TokenSigner;

const INVALID_CODE_MESSAGE: &str = "Invalid or expired OTP";
const PHONE_MISSING_MESSAGE: &str = "Your account does not have a phone number registered. \
                                     Please contact support or create a new account.";

/// Parameters for registering an account.
#[derive(Debug)]
pub struct RegisterParams<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub username: &'r str,
    pub password: &'r str,
    pub phone: &'r str,
    pub role: &'r str,
}

/// Account and recovery operations over the user and code repositories.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    codes: OneTimeCodeRepository<'a>,
    tokens: &'a TokenSigner,
    notifier: &'a dyn Notifier,
}

impl<'a> AuthService<'a> {
    /// Shortest password accepted when resetting.
    pub const MIN_PASSWORD_LENGTH: usize = 6;

    /// Create a new auth service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        tokens: &'a TokenSigner,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            users: UserRepository::new(pool),
            codes: OneTimeCodeRepository::new(pool),
            tokens,
            notifier,
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the email, phone, or role is
    /// malformed, `AppError::Conflict` if the username, email, or phone is
    /// already taken.
    pub async fn register(&self, params: RegisterParams<'_>) -> Result<User, AppError> {
        let email = Email::parse(params.email)
            .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;
        let phone = Phone::parse(params.phone)
            .map_err(|_| AppError::Validation("Phone number must be 10 digits".to_string()))?;
        let role = params
            .role
            .parse::<UserRole>()
            .map_err(|_| AppError::Validation("Role must be customer or admin".to_string()))?;

        // Pre-check gives the friendly message; the unique indexes still
        // catch racing registrations.
        if self
            .users
            .identity_exists(params.username, &email, &phone)
            .await?
        {
            return Err(AppError::Conflict(
                "Username, email, or phone already exists".to_string(),
            ));
        }

        let password_hash = hash_password(params.password)?;
        let user = self
            .users
            .create(&NewUser {
                name: params.name,
                username: params.username,
                email: &email,
                phone: &phone,
                password_hash: &password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AppError::Conflict("Username, email, or phone already exists".to_string())
                }
                other => AppError::from(other),
            })?;

        Ok(user)
    }

    /// Authenticate by username and password, issuing a session token.
    ///
    /// Unknown usernames and wrong passwords return the same error so the
    /// response does not reveal which accounts exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if the credentials are rejected.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AppError> {
        let Some((user, password_hash)) =
            self.users.find_by_username_with_password(username).await?
        else {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        };

        if !verify_password(password, &password_hash) {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = self
            .tokens
            .issue_session(&user)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

        Ok((token, user))
    }

    /// Start a password reset: generate a one-time code, store it against
    /// the account's phone (replacing any previous code), and send it to the
    /// account's email. Returns the masked email for display.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no account matches the identifier,
    /// `AppError::PhoneMissing` if the account has no phone on file, and
    /// `AppError::Notify` if the code cannot be delivered.
    pub async fn request_reset(&self, identifier: &str) -> Result<String, AppError> {
        let Some(user) = self.users.find_by_identifier(identifier).await? else {
            return Err(AppError::NotFound(
                "No account found with this username or email".to_string(),
            ));
        };
        let Some(phone) = user.phone.as_ref() else {
            return Err(AppError::PhoneMissing(PHONE_MISSING_MESSAGE.to_string()));
        };

        let code = generate_one_time_code();
        self.codes.replace_for_phone(phone, &code).await?;
        self.notifier
            .send_one_time_code(&user.email, &user.name, &code)
            .await?;

        Ok(user.email.masked())
    }

    /// Verify a one-time code and issue a short-lived reset token.
    ///
    /// The code is consumed atomically on match, so it can never validate
    /// twice; expired codes are indistinguishable from wrong ones.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no account matches the identifier and
    /// `AppError::Validation` if the code does not match or has expired.
    pub async fn verify_code(&self, identifier: &str, code: &str) -> Result<String, AppError> {
        let Some(user) = self.users.find_by_identifier(identifier).await? else {
            return Err(AppError::NotFound("User not found".to_string()));
        };
        // No phone means no code could have been issued.
        let Some(phone) = user.phone.as_ref() else {
            return Err(AppError::Validation(INVALID_CODE_MESSAGE.to_string()));
        };

        let Some(stored) = self.codes.consume_matching(phone, code).await? else {
            return Err(AppError::Validation(INVALID_CODE_MESSAGE.to_string()));
        };
        if stored.is_expired(Utc::now()) {
            return Err(AppError::Validation(INVALID_CODE_MESSAGE.to_string()));
        }

        self.tokens
            .issue_reset(user.id, phone)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Complete a password reset with a verified reset token.
    ///
    /// The token's embedded phone must still match the account, so a reset
    /// started before a phone change cannot finish after it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the password is too short or the
    /// token is invalid, expired, or stale; `AppError::NotFound` if the
    /// account no longer exists.
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<User, AppError> {
        if new_password.len() < Self::MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters long",
                Self::MIN_PASSWORD_LENGTH
            )));
        }

        let claims = self
            .tokens
            .verify_reset(reset_token)
            .map_err(|_| AppError::Validation("Invalid or expired reset token".to_string()))?;

        let Some(user) = self.users.find_by_id(claims.sub).await? else {
            return Err(AppError::NotFound("User not found".to_string()));
        };
        let phone_matches = user
            .phone
            .as_ref()
            .is_some_and(|p| p.as_str() == claims.phone);
        if !phone_matches {
            return Err(AppError::Validation("Invalid reset token".to_string()));
        }

        let password_hash = hash_password(new_password)?;
        self.users
            .update_password(user.id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
                other => AppError::from(other),
            })?;

        // Confirmation is best-effort; a failed send must not fail the reset.
        if let Err(e) = self
            .notifier
            .send_reset_confirmation(&user.email, &user.name)
            .await
        {
            tracing::warn!(error = %e, "failed to send reset confirmation email");
        }

        Ok(user)
    }
}

/// Hash a password with Argon2id and a random salt.
fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash.
///
/// Malformed hashes verify as false rather than erroring; a corrupted hash
/// should read as "wrong password", not take the endpoint down.
fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn different_passwords_produce_different_hashes() {
        let first = hash_password("password-one").unwrap();
        let second = hash_password("password-two").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn same_password_salts_differently() {
        let first = hash_password("repeat-after-me").unwrap();
        let second = hash_password("repeat-after-me").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
