//! Product repository.
//!
//! Catalog management is out of scope for this service; products are read to
//! validate review targets and written only to refresh their denormalized
//! rating aggregates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sunleaf_core::ProductId;

use super::RepositoryError;
use crate::models::{Product, RatingSummary};

/// Internal row type for `PostgreSQL` product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    image: Option<String>,
    average_rating: f64,
    review_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            image: row.image,
            average_rating: row.average_rating,
            review_count: row.review_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, image, average_rating, review_count, created_at, updated_at \
             FROM products WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Overwrite a product's rating aggregates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists,
    /// `RepositoryError::Database` for other failures.
    pub async fn update_rating_stats(
        &self,
        id: ProductId,
        summary: RatingSummary,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET average_rating = $2, review_count = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(summary.average_rating)
        .bind(i32::try_from(summary.review_count).unwrap_or(i32::MAX))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
