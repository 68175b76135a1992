//! Business logic services composed over the repositories.

pub mod auth;
pub mod notify;
pub mod reviews;

pub use auth::AuthService;
pub use notify::Notifier;
pub use reviews::ReviewService;
