//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sunleaf_core::{Email, ProductId, Rating, ReviewId, UserId};

use super::RepositoryError;
use crate::models::{ProductSummary, Review, ReviewWithContext, ReviewerSummary};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` review queries.
#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    user_name: String,
    rating: i16,
    comment: String,
    verified_purchase: bool,
    helpful: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(row.rating).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;

        Ok(Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user_id: UserId::new(row.user_id),
            user_name: row.user_name,
            rating,
            comment: row.comment,
            verified_purchase: row.verified_purchase,
            helpful: row.helpful,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for the moderation listing join.
#[derive(Debug, sqlx::FromRow)]
struct ReviewWithContextRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    user_name: String,
    rating: i16,
    comment: String,
    verified_purchase: bool,
    helpful: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    product_image: Option<String>,
    product_average_rating: f64,
    reviewer_name: String,
    reviewer_email: String,
}

impl TryFrom<ReviewWithContextRow> for ReviewWithContext {
    type Error = RepositoryError;

    fn try_from(row: ReviewWithContextRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(row.rating).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;
        let reviewer_email = Email::parse(&row.reviewer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            review: Review {
                id: ReviewId::new(row.id),
                product_id: ProductId::new(row.product_id),
                user_id: UserId::new(row.user_id),
                user_name: row.user_name,
                rating,
                comment: row.comment,
                verified_purchase: row.verified_purchase,
                helpful: row.helpful,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            product: ProductSummary {
                id: ProductId::new(row.product_id),
                name: row.product_name,
                image: row.product_image,
                average_rating: row.product_average_rating,
            },
            reviewer: ReviewerSummary {
                id: UserId::new(row.user_id),
                name: row.reviewer_name,
                email: reviewer_email,
            },
        })
    }
}

const REVIEW_COLUMNS: &str = "id, product_id, user_id, user_name, rating, comment, \
                              verified_purchase, helpful, created_at, updated_at";

/// Parameters for creating a review.
#[derive(Debug)]
pub struct NewReview<'a> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: &'a str,
    pub rating: Rating,
    pub comment: &'a str,
    pub verified_purchase: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a product's reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let query = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews \
             WHERE product_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&query)
            .bind(product_id.as_i32())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List every review with its product and reviewer attached, newest
    /// first. Backs the moderation listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_with_context(&self) -> Result<Vec<ReviewWithContext>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewWithContextRow>(
            "SELECT r.id, r.product_id, r.user_id, r.user_name, r.rating, r.comment, \
                    r.verified_purchase, r.helpful, r.created_at, r.updated_at, \
                    p.name AS product_name, p.image AS product_image, \
                    p.average_rating AS product_average_rating, \
                    u.name AS reviewer_name, u.email AS reviewer_email \
             FROM reviews r \
             JOIN products p ON p.id = r.product_id \
             JOIN users u ON u.id = r.user_id \
             ORDER BY r.created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Look up a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let row = sqlx::query_as::<_, ReviewRow>(&query)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Whether this user has already reviewed this product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_for(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE product_id = $1 AND user_id = $2)",
        )
        .bind(product_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a new review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed this
    /// product, `RepositoryError::Database` for other failures.
    pub async fn create(&self, review: &NewReview<'_>) -> Result<Review, RepositoryError> {
        let query = format!(
            "INSERT INTO reviews (product_id, user_id, user_name, rating, comment, verified_purchase) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReviewRow>(&query)
            .bind(review.product_id.as_i32())
            .bind(review.user_id.as_i32())
            .bind(review.user_name)
            .bind(review.rating.as_i16())
            .bind(review.comment)
            .bind(review.verified_purchase)
            .fetch_one(self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    RepositoryError::Conflict("user already reviewed this product".to_string())
                }
                other => RepositoryError::Database(other),
            })?;

        row.try_into()
    }

    /// Apply a partial update to a review, returning the new state.
    ///
    /// `None` fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such review exists,
    /// `RepositoryError::Database` for other failures.
    pub async fn update(
        &self,
        id: ReviewId,
        rating: Option<Rating>,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let query = format!(
            "UPDATE reviews SET rating = COALESCE($2, rating), \
                                comment = COALESCE($3, comment), \
                                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReviewRow>(&query)
            .bind(id.as_i32())
            .bind(rating.map(Rating::as_i16))
            .bind(comment)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such review exists,
    /// `RepositoryError::Database` for other failures.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// All ratings currently on file for a product. Feeds aggregate
    /// recomputation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ratings_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<i16>, RepositoryError> {
        let ratings = sqlx::query_scalar::<_, i16>("SELECT rating FROM reviews WHERE product_id = $1")
            .bind(product_id.as_i32())
            .fetch_all(self.pool)
            .await?;
        Ok(ratings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn row_with_out_of_range_rating_is_data_corruption() {
        let now = Utc::now();
        let row = ReviewRow {
            id: 1,
            product_id: 2,
            user_id: 3,
            user_name: "Rosa".to_string(),
            rating: 9,
            comment: "great".to_string(),
            verified_purchase: true,
            helpful: 0,
            created_at: now,
            updated_at: now,
        };
        let err = Review::try_from(row).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }
}
