//! One-time recovery code repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sunleaf_core::{CodeId, Phone};

use super::RepositoryError;
use crate::models::StoredCode;

/// Internal row type for `PostgreSQL` one-time code queries.
#[derive(Debug, sqlx::FromRow)]
struct CodeRow {
    id: i32,
    phone: String,
    code: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CodeRow> for StoredCode {
    type Error = RepositoryError;

    fn try_from(row: CodeRow) -> Result<Self, Self::Error> {
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Self {
            id: CodeId::new(row.id),
            phone,
            code: row.code,
            created_at: row.created_at,
        })
    }
}

/// Repository for one-time recovery codes.
///
/// The `one_time_codes` table keys on phone, so a phone can hold at most one
/// active code and issuing a new one atomically replaces the old.
pub struct OneTimeCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OneTimeCodeRepository<'a> {
    /// Create a new one-time code repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code for a phone, replacing any previous one.
    ///
    /// `created_at` is reset on replacement so the validity window always
    /// starts from the most recent request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn replace_for_phone(&self, phone: &Phone, code: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO one_time_codes (phone, code) VALUES ($1, $2) \
             ON CONFLICT (phone) DO UPDATE SET code = EXCLUDED.code, created_at = NOW()",
        )
        .bind(phone.as_str())
        .bind(code)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Atomically find and delete the code matching this phone and value.
    ///
    /// Deleting in the same statement keeps codes single-use even when two
    /// verification attempts race. The caller still has to check expiry on
    /// the returned row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn consume_matching(
        &self,
        phone: &Phone,
        code: &str,
    ) -> Result<Option<StoredCode>, RepositoryError> {
        let row = sqlx::query_as::<_, CodeRow>(
            "DELETE FROM one_time_codes WHERE phone = $1 AND code = $2 \
             RETURNING id, phone, code, created_at",
        )
        .bind(phone.as_str())
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
