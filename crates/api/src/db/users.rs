//! User account repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sunleaf_core::{Email, Phone, UserId, UserRole};

use super::RepositoryError;
use crate::models::User;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
///
/// Carries the password hash so authentication lookups need a single query;
/// the hash never leaves this module except through
/// [`UserRepository::find_by_username_with_password`].
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    username: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = row
            .phone
            .as_deref()
            .map(Phone::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
            })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            username: row.username,
            email,
            phone,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, name, username, email, phone, password_hash, role, created_at, updated_at";

/// Parameters for creating a user account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a Email,
    pub phone: &'a Phone,
    pub password_hash: &'a str,
    pub role: UserRole,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user account database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether any account already uses this username, email, or phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn identity_exists(
        &self,
        username: &str,
        email: &Email,
        phone: &Phone,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2 OR phone = $3)",
        )
        .bind(username)
        .bind(email.as_str())
        .bind(phone.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username, email, or phone is
    /// already taken, `RepositoryError::Database` for other failures.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<User, RepositoryError> {
        let query = format!(
            "INSERT INTO users (name, username, email, phone, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user.name)
            .bind(user.username)
            .bind(user.email.as_str())
            .bind(user.phone.as_str())
            .bind(user.password_hash)
            .bind(user.role)
            .fetch_one(self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    RepositoryError::Conflict("username, email, or phone already exists".to_string())
                }
                other => RepositoryError::Database(other),
            })?;

        row.try_into()
    }

    /// Look up an account by username, returning the stored password hash
    /// alongside it for verification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn find_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;

        row.map(|row| {
            let hash = row.password_hash.clone();
            row.try_into().map(|user| (user, hash))
        })
        .transpose()
    }

    /// Look up an account by username or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(identifier)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Look up an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Replace an account's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such account exists,
    /// `RepositoryError::Database` for other failures.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_i32())
                .bind(password_hash)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_row() -> UserRow {
        let now = Utc::now();
        UserRow {
            id: 1,
            name: "Rosa Alvarez".to_string(),
            username: "rosa".to_string(),
            email: "rosa@example.com".to_string(),
            phone: Some("5551234567".to_string()),
            password_hash: "$argon2id$...".to_string(),
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_user() {
        let user: User = sample_row().try_into().unwrap();
        assert_eq!(user.id, UserId::new(1));
        assert_eq!(user.email.as_str(), "rosa@example.com");
        assert_eq!(user.phone.unwrap().as_str(), "5551234567");
    }

    #[test]
    fn row_without_phone_converts() {
        let mut row = sample_row();
        row.phone = None;
        let user: User = row.try_into().unwrap();
        assert!(user.phone.is_none());
    }

    #[test]
    fn invalid_email_is_data_corruption() {
        let mut row = sample_row();
        row.email = "not-an-email".to_string();
        let err = User::try_from(row).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }
}
