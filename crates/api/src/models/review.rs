//! Reviews and the denormalized shapes the moderation listing surfaces.

use chrono::{DateTime, Utc};
use sunleaf_core::{Email, ProductId, Rating, ReviewId, UserId};

/// A customer review of a product.
///
/// `user_name` is snapshotted at submission time so listings stay stable if
/// the account is later renamed. `verified_purchase` is always true for
/// reviews created through the API because submission is purchase-gated.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: String,
    pub rating: Rating,
    pub comment: String,
    pub verified_purchase: bool,
    pub helpful: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Longest comment accepted, in characters.
    pub const MAX_COMMENT_CHARS: usize = 1000;
}

/// Product fields joined onto a review for the moderation listing.
#[derive(Debug, Clone)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub average_rating: f64,
}

/// Reviewer fields joined onto a review for the moderation listing.
#[derive(Debug, Clone)]
pub struct ReviewerSummary {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A review together with the product and reviewer it belongs to.
#[derive(Debug, Clone)]
pub struct ReviewWithContext {
    pub review: Review,
    pub product: ProductSummary,
    pub reviewer: ReviewerSummary,
}
