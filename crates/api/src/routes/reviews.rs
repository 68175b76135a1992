//! Review endpoints.
//!
//! Reading a product's reviews is public. Submitting, editing, and deleting
//! require a session token, and submission is purchase-gated: only customers
//! with a qualifying order for the product may review it. Every write
//! recomputes the product's rating aggregates.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sunleaf_core::{ProductId, Rating, ReviewId, UserId};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{ProductSummary, Review, ReviewWithContext, ReviewerSummary};
use crate::services::ReviewService;
use crate::state::AppState;

/// Build the review router.
///
/// `/all` must be registered on its own path so the static segment wins over
/// the `{id}` capture.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_review))
        .route("/all", get(list_all_reviews))
        .route(
            "/{id}",
            get(list_product_reviews)
                .put(update_review)
                .delete(delete_review),
        )
}

/// A review as serialized on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
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

impl From<Review> for ReviewBody {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            product_id: review.product_id,
            user_id: review.user_id,
            user_name: review.user_name,
            rating: review.rating,
            comment: review.comment,
            verified_purchase: review.verified_purchase,
            helpful: review.helpful,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

/// Product fields attached to a review in the moderation listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryBody {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub average_rating: f64,
}

impl From<ProductSummary> for ProductSummaryBody {
    fn from(product: ProductSummary) -> Self {
        Self {
            id: product.id,
            name: product.name,
            image: product.image,
            average_rating: product.average_rating,
        }
    }
}

/// Reviewer fields attached to a review in the moderation listing.
#[derive(Debug, Serialize)]
pub struct ReviewerSummaryBody {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<ReviewerSummary> for ReviewerSummaryBody {
    fn from(reviewer: ReviewerSummary) -> Self {
        Self {
            id: reviewer.id,
            name: reviewer.name,
            email: reviewer.email.into_inner(),
        }
    }
}

/// A review with its product and reviewer, for the moderation listing.
#[derive(Debug, Serialize)]
pub struct ModerationReviewBody {
    #[serde(flatten)]
    pub review: ReviewBody,
    pub product: ProductSummaryBody,
    pub user: ReviewerSummaryBody,
}

impl From<ReviewWithContext> for ModerationReviewBody {
    fn from(entry: ReviewWithContext) -> Self {
        Self {
            review: entry.review.into(),
            product: entry.product.into(),
            user: entry.reviewer.into(),
        }
    }
}

/// Response carrying a product's reviews.
#[derive(Debug, Serialize)]
pub struct ProductReviewsResponse {
    pub success: bool,
    pub reviews: Vec<ReviewBody>,
}

/// Response carrying a single review after a write.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub review: ReviewBody,
}

/// Response after deleting a review.
#[derive(Debug, Serialize)]
pub struct DeleteReviewResponse {
    pub success: bool,
    pub message: String,
}

/// List every review with product and reviewer context, newest first.
///
/// GET /api/reviews/all
async fn list_all_reviews(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<ModerationReviewBody>>, AppError> {
    let service = ReviewService::new(state.pool());
    let reviews = service.list_all().await?;

    Ok(Json(reviews.into_iter().map(Into::into).collect()))
}

/// List a product's reviews, newest first.
///
/// GET /api/reviews/{id}
async fn list_product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductReviewsResponse>, AppError> {
    let service = ReviewService::new(state.pool());
    let reviews = service
        .list_for_product(ProductId::new(product_id))
        .await?;

    Ok(Json(ProductReviewsResponse {
        success: true,
        reviews: reviews.into_iter().map(Into::into).collect(),
    }))
}

/// Request to submit a review.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub product_id: Option<i32>,
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

/// Submit a review for a purchased product.
///
/// POST /api/reviews
async fn submit_review(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    const REQUIRED: &str = "All fields are required";

    let product_id = req
        .product_id
        .ok_or_else(|| AppError::Validation(REQUIRED.to_string()))?;
    let rating = req
        .rating
        .ok_or_else(|| AppError::Validation(REQUIRED.to_string()))?;
    let comment = req
        .comment
        .ok_or_else(|| AppError::Validation(REQUIRED.to_string()))?;

    let service = ReviewService::new(state.pool());
    let review = service
        .submit(
            claims.sub,
            &claims.name,
            ProductId::new(product_id),
            rating,
            &comment,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            success: true,
            review: review.into(),
        }),
    ))
}

/// Request to update a review. Omitted fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

/// Update the caller's own review.
///
/// PUT /api/reviews/{id}
async fn update_review(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(review_id): Path<i32>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    let service = ReviewService::new(state.pool());
    let review = service
        .update(
            claims.sub,
            ReviewId::new(review_id),
            req.rating,
            req.comment.as_deref(),
        )
        .await?;

    Ok(Json(ReviewResponse {
        success: true,
        review: review.into(),
    }))
}

/// Delete a review. Owners can delete their own; admins can delete any.
///
/// DELETE /api/reviews/{id}
async fn delete_review(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(review_id): Path<i32>,
) -> Result<Json<DeleteReviewResponse>, AppError> {
    let service = ReviewService::new(state.pool());
    service
        .delete(claims.sub, claims.role, ReviewId::new(review_id))
        .await?;

    Ok(Json(DeleteReviewResponse {
        success: true,
        message: "Review deleted successfully".to_string(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sunleaf_core::Email;

    fn sample_review() -> Review {
        Review {
            id: ReviewId::new(3),
            product_id: ProductId::new(11),
            user_id: UserId::new(7),
            user_name: "Ravi Kumar".to_string(),
            rating: Rating::new(4).unwrap(),
            comment: "Healthy saplings, well packed.".to_string(),
            verified_purchase: true,
            helpful: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_review_body_uses_camel_case_keys() {
        let body = ReviewBody::from(sample_review());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["productId"], 11);
        assert_eq!(json["userName"], "Ravi Kumar");
        assert_eq!(json["verifiedPurchase"], true);
        assert_eq!(json["rating"], 4);
        assert!(json.get("product_id").is_none());
    }

    #[test]
    fn test_moderation_body_flattens_review_fields() {
        let entry = ReviewWithContext {
            review: sample_review(),
            product: ProductSummary {
                id: ProductId::new(11),
                name: "Coconut Sapling".to_string(),
                image: None,
                average_rating: 4.2,
            },
            reviewer: ReviewerSummary {
                id: UserId::new(7),
                name: "Ravi Kumar".to_string(),
                email: Email::parse("ravi@example.com").unwrap(),
            },
        };
        let json = serde_json::to_value(ModerationReviewBody::from(entry)).unwrap();
        assert_eq!(json["comment"], "Healthy saplings, well packed.");
        assert_eq!(json["product"]["averageRating"], 4.2);
        assert_eq!(json["user"]["email"], "ravi@example.com");
    }

    #[test]
    fn test_submit_request_accepts_camel_case_fields() {
        let req: SubmitReviewRequest =
            serde_json::from_str(r#"{"productId": 11, "rating": 5, "comment": "Great"}"#).unwrap();
        assert_eq!(req.product_id, Some(11));
        assert_eq!(req.rating, Some(5));
    }
}
