//! Integration tests for Sunleaf.
//!
//! # Running Tests
//!
//! ```bash
//! # Start PostgreSQL and run migrations
//! cargo run -p sunleaf-cli -- migrate run
//!
//! # Start the API server
//! cargo run -p sunleaf-api
//!
//! # Run integration tests (ignored by default)
//! cargo test -p sunleaf-integration-tests -- --ignored
//! ```
//!
//! Tests drive the running server over HTTP and reach into the database
//! directly only where the API deliberately has no surface: reading issued
//! one-time codes and seeding products and orders.
//!
//! # Environment Variables
//!
//! - `API_BASE_URL` - Base URL of the running server (default
//!   `http://localhost:3001`)
//! - `DATABASE_URL` - `PostgreSQL` connection string for seeding

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Connect to the test database for seeding and verification.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is unset or the database is unreachable; these
/// tests cannot run without it.
pub async fn connect_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database")
}

/// Short unique suffix for usernames and emails so repeated runs never
/// collide.
#[must_use]
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

/// Random 10-digit phone number for registrations.
#[must_use]
pub fn unique_phone() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(10)
        .map(|b| char::from(b'0' + (b % 10)))
        .collect()
}
