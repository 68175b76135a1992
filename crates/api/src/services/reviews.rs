//! Review submission, moderation, and product rating aggregates.

use sqlx::PgPool;

use sunleaf_core::{ProductId, Rating, ReviewId, UserId, UserRole};

use crate::db::reviews::NewReview;
use crate::db::{OrderRepository, ProductRepository, RepositoryError, ReviewRepository};
use crate::error::AppError;
use crate::models::{RatingSummary, Review, ReviewWithContext};

const ALREADY_REVIEWED_MESSAGE: &str = "You have already reviewed this product";
const PURCHASE_REQUIRED_MESSAGE: &str = "You can only review products you have purchased. \
                                         Please buy this product first to leave a review.";

/// Review operations over the review, product, and order repositories.
pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
    products: ProductRepository<'a>,
    orders: OrderRepository<'a>,
}

impl<'a> ReviewService<'a> {
    /// Create a new review service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
            products: ProductRepository::new(pool),
            orders: OrderRepository::new(pool),
        }
    }

    /// A product's reviews, newest first. Public.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Review>, AppError> {
        Ok(self.reviews.list_for_product(product_id).await?)
    }

    /// Every review with product and reviewer context, newest first. Backs
    /// the moderation listing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn list_all(&self) -> Result<Vec<ReviewWithContext>, AppError> {
        Ok(self.reviews.list_with_context().await?)
    }

    /// Submit a review for a purchased product.
    ///
    /// `user_name` is snapshotted onto the review so listings stay stable
    /// across account renames.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a bad rating or comment,
    /// `AppError::NotFound` if the product does not exist,
    /// `AppError::Conflict` if the user already reviewed it, and
    /// `AppError::Forbidden` if no qualifying purchase exists.
    pub async fn submit(
        &self,
        user_id: UserId,
        user_name: &str,
        product_id: ProductId,
        rating: i16,
        comment: &str,
    ) -> Result<Review, AppError> {
        let rating = parse_rating(rating)?;
        let comment = validate_comment(comment)?;

        if self.products.find_by_id(product_id).await?.is_none() {
            return Err(AppError::NotFound("Product not found".to_string()));
        }
        if self.reviews.exists_for(product_id, user_id).await? {
            return Err(AppError::Conflict(ALREADY_REVIEWED_MESSAGE.to_string()));
        }

        // A failed order lookup denies rather than waving the review
        // through; the gate fails closed.
        let purchased = match self.orders.has_qualifying_order(user_id, product_id).await {
            Ok(purchased) => purchased,
            Err(e) => {
                tracing::warn!(error = %e, "order lookup failed; denying review");
                false
            }
        };
        if !purchased {
            return Err(AppError::Forbidden(PURCHASE_REQUIRED_MESSAGE.to_string()));
        }

        let review = self
            .reviews
            .create(&NewReview {
                product_id,
                user_id,
                user_name,
                rating,
                comment,
                verified_purchase: true,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AppError::Conflict(ALREADY_REVIEWED_MESSAGE.to_string())
                }
                other => AppError::from(other),
            })?;

        self.recompute_logged(product_id).await;
        Ok(review)
    }

    /// Update the rating and/or comment of the caller's own review.
    ///
    /// Omitted fields keep their current value; an empty comment counts as
    /// omitted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the review does not exist,
    /// `AppError::Forbidden` if it belongs to someone else, and
    /// `AppError::Validation` for bad supplied values.
    pub async fn update(
        &self,
        user_id: UserId,
        review_id: ReviewId,
        rating: Option<i16>,
        comment: Option<&str>,
    ) -> Result<Review, AppError> {
        let Some(existing) = self.reviews.find_by_id(review_id).await? else {
            return Err(AppError::NotFound("Review not found".to_string()));
        };
        if existing.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only edit your own reviews".to_string(),
            ));
        }

        let rating = rating.map(parse_rating).transpose()?;
        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(validate_comment)
            .transpose()?;

        let review = self.reviews.update(review_id, rating, comment).await?;

        self.recompute_logged(review.product_id).await;
        Ok(review)
    }

    /// Delete a review. Owners can delete their own; admins can delete any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the review does not exist and
    /// `AppError::Forbidden` if the caller may not delete it.
    pub async fn delete(
        &self,
        user_id: UserId,
        role: UserRole,
        review_id: ReviewId,
    ) -> Result<(), AppError> {
        let Some(existing) = self.reviews.find_by_id(review_id).await? else {
            return Err(AppError::NotFound("Review not found".to_string()));
        };
        if existing.user_id != user_id && !role.can_moderate_reviews() {
            return Err(AppError::Forbidden(
                "You can only delete your own reviews".to_string(),
            ));
        }

        self.reviews.delete(review_id).await?;

        self.recompute_logged(existing.product_id).await;
        Ok(())
    }

    /// Recompute a product's aggregates, logging failures instead of
    /// propagating them: the review write already committed, and stale
    /// aggregates heal on the next recomputation.
    async fn recompute_logged(&self, product_id: ProductId) {
        if let Err(e) = self.recompute_product_rating(product_id).await {
            tracing::error!(
                error = %e,
                product_id = %product_id,
                "failed to recompute product rating aggregates"
            );
        }
    }

    /// Rebuild a product's `average_rating` and `review_count` from its full
    /// review set.
    async fn recompute_product_rating(&self, product_id: ProductId) -> Result<(), AppError> {
        let ratings = self.reviews.ratings_for_product(product_id).await?;
        let summary = RatingSummary::from_ratings(&ratings);
        self.products
            .update_rating_stats(product_id, summary)
            .await?;
        Ok(())
    }
}

fn parse_rating(rating: i16) -> Result<Rating, AppError> {
    Rating::new(rating)
        .map_err(|_| AppError::Validation("Rating must be between 1 and 5".to_string()))
}

fn validate_comment(comment: &str) -> Result<&str, AppError> {
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(AppError::Validation("All fields are required".to_string()));
    }
    if comment.chars().count() > Review::MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {} characters",
            Review::MAX_COMMENT_CHARS
        )));
    }
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_enforced() {
        assert!(parse_rating(0).is_err());
        assert!(parse_rating(6).is_err());
        assert!(parse_rating(1).is_ok());
        assert!(parse_rating(5).is_ok());
    }

    #[test]
    fn comment_is_trimmed_and_bounded() {
        assert_eq!(validate_comment("  fresh and crisp  ").ok(), Some("fresh and crisp"));
        assert!(validate_comment(&"x".repeat(1000)).is_ok());
        assert!(validate_comment(&"x".repeat(1001)).is_err());
        assert!(validate_comment("   ").is_err());
    }
}
