//! User domain types.

use chrono::{DateTime, Utc};

use sunleaf_core::{Email, Phone, UserId, UserRole};

/// A registered account (domain type).
///
/// The password hash is deliberately not part of this type; repositories
/// return it separately to the one service that verifies or rewrites it.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name shown on reviews and in emails.
    pub name: String,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: Email,
    /// Unique phone number.
    ///
    /// Accounts that predate the phone requirement may not have one; the
    /// password-recovery flow rejects those until a phone is added.
    pub phone: Option<Phone>,
    /// Account role.
    pub role: UserRole,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}
