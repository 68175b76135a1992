//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (pings the database)
//!
//! # Auth
//! POST /api/auth/register         - Register a new account
//! POST /api/auth/login            - Log in, returns a session token
//! POST /api/auth/request-otp      - Email a one-time code for password reset
//! POST /api/auth/verify-otp       - Exchange the code for a reset token
//! POST /api/auth/reset-password   - Set a new password with the reset token
//!
//! # Reviews
//! GET    /api/reviews/{id}        - List a product's reviews (public)
//! GET    /api/reviews/all         - List all reviews with context (auth)
//! POST   /api/reviews             - Submit a review (auth, purchase-gated)
//! PUT    /api/reviews/{id}        - Update own review (auth)
//! DELETE /api/reviews/{id}        - Delete own review, or any as admin (auth)
//! ```

pub mod auth;
pub mod reviews;

use axum::Router;

use crate::state::AppState;

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/reviews", reviews::router())
}
