//! Products and their review aggregates.

use chrono::{DateTime, Utc};
use sunleaf_core::ProductId;

/// A catalog product with its denormalized review aggregates.
///
/// Catalog management lives elsewhere; this service only reads products and
/// rewrites `average_rating` / `review_count` when the review set changes.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub average_rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregates recomputed from a product's full review set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: i64,
}

impl RatingSummary {
    /// Derives the aggregates from the current set of ratings.
    ///
    /// The average is rounded to one decimal place. An empty set yields an
    /// average of `0.0`, not NaN, so products with no reviews read cleanly.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self { average_rating: 0.0, review_count: 0 };
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let mean = sum as f64 / ratings.len() as f64;
        Self {
            average_rating: (mean * 10.0).round() / 10.0,
            review_count: ratings.len() as i64,
        }
    }
}
