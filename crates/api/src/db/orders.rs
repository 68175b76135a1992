//! Order repository.
//!
//! Order placement and fulfillment live elsewhere; this service only asks
//! one question of order history: has this user bought this product?

use sqlx::PgPool;

use sunleaf_core::{OrderStatus, ProductId, UserId};

use super::RepositoryError;

/// Repository for order history lookups.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether the user has an order containing this product in a status
    /// that qualifies for reviewing (any status except cancelled).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_qualifying_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let statuses: Vec<OrderStatus> = OrderStatus::REVIEW_QUALIFYING.to_vec();
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                SELECT 1 FROM orders o \
                JOIN order_items oi ON oi.order_id = o.id \
                WHERE o.user_id = $1 AND oi.product_id = $2 AND o.status = ANY($3) \
             )",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .bind(statuses)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}
