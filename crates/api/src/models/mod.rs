//! Domain types for the API.
//!
//! These types represent validated domain objects separate from database row
//! types.

pub mod code;
pub mod product;
pub mod review;
pub mod user;

pub use code::StoredCode;
pub use product::{Product, RatingSummary};
pub use review::{ProductSummary, Review, ReviewerSummary, ReviewWithContext};
pub use user::User;
